//! Admin API of the authorization server.
//!
//! [`AdminApi`] is the capability the resolvers need; [`HttpAdminClient`] is
//! the production implementation talking HTTP(S) to the admin endpoints.

pub mod client;
pub mod types;

pub use self::client::{AdminConfig, HttpAdminClient, DEFAULT_ADMIN_URL, MAX_FETCH_ATTEMPTS};
pub use self::types::{
    AcceptConsent, AcceptLogin, ChallengeInfo, ConsentSession, OAuth2Client, RedirectTo,
    Rejection,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The admin API answered with a non-success status.
    #[error("{status}, {message}")]
    Status {
        status: u16,
        message: String,
        body: String,
    },
    #[error("admin API request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("invalid admin API response: {0}")]
    InvalidResponse(String),
    #[error("invalid admin API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Upstream HTTP status, if the admin API answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Network failures and 5xx answers may succeed on a second try.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Request(_) => true,
            Self::InvalidResponse(_) | Self::Url(_) => false,
        }
    }
}

/// The three kinds of pending requests the admin API manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Login,
    Consent,
    Logout,
}

impl RequestKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Consent => "consent",
            Self::Logout => "logout",
        }
    }

    /// Query parameter carrying the challenge, both inbound and on admin calls.
    #[must_use]
    pub const fn challenge_param(self) -> &'static str {
        match self {
            Self::Login => "login_challenge",
            Self::Consent => "consent_challenge",
            Self::Logout => "logout_challenge",
        }
    }
}

/// Operations against the authorization server's admin surface.
///
/// Fetches are safe to repeat; accept/reject calls change remote state and
/// must be issued at most once per decision.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn get_login_request(&self, challenge: &str) -> Result<ChallengeInfo, Error>;

    async fn accept_login_request(
        &self,
        challenge: &str,
        body: &AcceptLogin,
    ) -> Result<RedirectTo, Error>;

    async fn reject_login_request(
        &self,
        challenge: &str,
        body: &Rejection,
    ) -> Result<RedirectTo, Error>;

    async fn get_consent_request(&self, challenge: &str) -> Result<ChallengeInfo, Error>;

    async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsent,
    ) -> Result<RedirectTo, Error>;

    async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &Rejection,
    ) -> Result<RedirectTo, Error>;

    async fn get_logout_request(&self, challenge: &str) -> Result<ChallengeInfo, Error>;

    async fn accept_logout_request(&self, challenge: &str) -> Result<RedirectTo, Error>;

    /// Liveness of the admin API, reported by `/health`.
    async fn health(&self) -> Result<(), Error>;
}
