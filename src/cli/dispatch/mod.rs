//! Map validated CLI matches to the action that runs the server.

use crate::api::DEFAULT_PORT;
use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{admin, client, ARG_DSN, ARG_PORT, ARG_PREFIX};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(DEFAULT_PORT);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")?;
    let prefix = matches
        .get_one::<String>(ARG_PREFIX)
        .cloned()
        .context("missing required argument: --prefix")?;
    let client_base_url = matches
        .get_one::<String>(client::ARG_CLIENT_BASE_URL)
        .cloned()
        .context("missing required argument: --client-base-url")?;
    let cors_origin = matches.get_one::<String>(client::ARG_CORS_ORIGIN).cloned();

    Ok(Action::Server(Args {
        port,
        dsn,
        prefix,
        admin: admin::Options::parse(matches)?,
        client_base_url,
        cors_origin,
    }))
}
