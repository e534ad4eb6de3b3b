//! # Tollgate (login, consent and logout bridge)
//!
//! `tollgate` sits between an OAuth2/OIDC authorization server and the
//! browser-facing login UI. The authorization server redirects the user agent
//! here with a *challenge*; tollgate looks the challenge up through the
//! server's admin API and either finalizes it right away (the server already
//! knows enough, `skip == true`) or sends the user to the UI. When the UI posts
//! back, tollgate checks credentials or the consent decision and tells the
//! admin API to accept or reject, relaying the returned redirect.
//!
//! ## Layers
//!
//! - [`admin`]: the admin API contract ([`admin::AdminApi`]) and its HTTP client.
//! - [`users`]: the credential store (`PostgreSQL`) and Argon2id password checks.
//! - [`flow`]: login, consent and logout resolvers. They only talk to the
//!   traits above and know nothing about HTTP frameworks.
//! - [`api`]: the axum adapter exposing the resolvers over HTTP.
//! - [`cli`]: argument parsing, telemetry and server start-up.
//!
//! Challenges are never cached: every decision is made against request state
//! fetched from the admin API immediately before deciding.

pub mod admin;
pub mod api;
pub mod cli;
pub mod flow;
pub mod users;

#[cfg(test)]
mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
