//! Challenge resolution for login, consent and logout.
//!
//! Each flow has two entry points: `resolve` runs when the authorization
//! server redirects the user agent here with a challenge, `submit` runs when
//! the UI posts the user's decision back. Flows hold only injected
//! capabilities ([`AdminApi`](crate::admin::AdminApi),
//! [`UserStore`](crate::users::UserStore)) and the UI base URL, so they are
//! shared freely between concurrent requests.

pub mod consent;
pub mod login;
pub mod logout;

pub use self::consent::{ConsentFlow, ConsentSubmission, GrantScope};
pub use self::login::{LoginFlow, LoginSubmission};
pub use self::logout::LogoutFlow;

use crate::{admin, admin::RequestKind, users::StorageError};
use anyhow::{anyhow, Context};
use thiserror::Error;
use url::Url;

/// Value of the `submit` field when the user refuses.
pub const DENY_ACCESS: &str = "Deny access";

/// How long the authorization server remembers a login or consent, in seconds.
pub const REMEMBER_FOR_SECONDS: u64 = 3600;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Upstream(#[from] admin::Error),
    #[error("The username / password combination is not correct")]
    Auth,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Internal(String),
}

/// Where the user agent goes after `resolve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The request was finalized upstream; continue at the authorization server.
    Redirect(String),
    /// The user has to decide; continue at the UI.
    NeedsUi(String),
}

impl Resolution {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Redirect(url) | Self::NeedsUi(url) => url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAction {
    Accept,
    Deny,
}

impl SubmitAction {
    /// Anything but the exact deny label counts as accepting.
    #[must_use]
    pub fn from_submit(submit: Option<&str>) -> Self {
        if submit == Some(DENY_ACCESS) {
            Self::Deny
        } else {
            Self::Accept
        }
    }
}

/// Parse the UI base URL used to build `NeedsUi` redirects.
///
/// # Errors
/// Returns an error unless `raw` is an absolute http(s) URL.
pub fn parse_client_base_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid client base URL: {raw}"))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(anyhow!("Client base URL must be an http(s) URL: {raw}"));
    }

    Ok(url)
}

fn require_challenge(kind: RequestKind, challenge: &str) -> Result<&str, Error> {
    let challenge = challenge.trim();

    if challenge.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Expected a {} challenge to be set but received none.",
            kind.as_str()
        )));
    }

    Ok(challenge)
}

/// `{base}/{page}?k=v&...`, query values form-encoded.
fn ui_url(base: &Url, page: &str, params: &[(&str, &str)]) -> Result<String, Error> {
    let mut url = base.clone();

    url.path_segments_mut()
        .map_err(|()| Error::Internal(format!("Client base URL cannot be a base: {base}")))?
        .pop_if_empty()
        .push(page);

    url.set_query(None);
    url.set_fragment(None);

    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }

    Ok(url.into())
}
