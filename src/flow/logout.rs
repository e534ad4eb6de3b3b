use super::{require_challenge, ui_url, Error, Resolution};
use crate::admin::{AdminApi, RequestKind};
use std::sync::Arc;
use tracing::instrument;
use url::Url;

/// Logout always goes through the UI; there is no skip or deny path.
#[derive(Clone)]
pub struct LogoutFlow {
    admin: Arc<dyn AdminApi>,
    client_base_url: Url,
}

impl LogoutFlow {
    #[must_use]
    pub fn new(admin: Arc<dyn AdminApi>, client_base_url: Url) -> Self {
        Self {
            admin,
            client_base_url,
        }
    }

    /// # Errors
    /// [`Error::InvalidInput`] for a blank challenge, [`Error::Upstream`] when the admin API fails.
    #[instrument(skip(self))]
    pub async fn resolve(&self, challenge: &str) -> Result<Resolution, Error> {
        let challenge = require_challenge(RequestKind::Logout, challenge)?;

        // only checks that the request exists
        self.admin.get_logout_request(challenge).await?;

        Ok(Resolution::NeedsUi(ui_url(
            &self.client_base_url,
            "logout",
            &[("challenge", challenge)],
        )?))
    }

    /// # Errors
    /// [`Error::InvalidInput`] for a blank challenge, [`Error::Upstream`] when the admin API fails.
    #[instrument(skip(self))]
    pub async fn submit(&self, challenge: &str) -> Result<String, Error> {
        let challenge = require_challenge(RequestKind::Logout, challenge)?;
        let redirect = self.admin.accept_logout_request(challenge).await?;

        Ok(redirect.redirect_to)
    }
}
