use super::{require_challenge, ui_url, Error, Resolution, SubmitAction, REMEMBER_FOR_SECONDS};
use crate::{
    admin::{AcceptLogin, AdminApi, Rejection, RequestKind},
    users::{normalize_email, password::verify_credentials, UserStore},
};
use secrecy::SecretString;
use std::{fmt, sync::Arc};
use tracing::{debug, instrument};
use url::Url;

/// Authentication context class reference sent with password logins.
pub const PASSWORD_ACR: &str = "0";

/// What the login UI posts back.
#[derive(Default)]
pub struct LoginSubmission {
    pub challenge: String,
    pub submit: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
    pub remember: Option<bool>,
}

impl fmt::Debug for LoginSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSubmission")
            .field("challenge", &self.challenge)
            .field("submit", &self.submit)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("remember", &self.remember)
            .finish()
    }
}

#[derive(Clone)]
pub struct LoginFlow {
    admin: Arc<dyn AdminApi>,
    users: Arc<dyn UserStore>,
    client_base_url: Url,
}

impl LoginFlow {
    #[must_use]
    pub fn new(admin: Arc<dyn AdminApi>, users: Arc<dyn UserStore>, client_base_url: Url) -> Self {
        Self {
            admin,
            users,
            client_base_url,
        }
    }

    /// Skip the UI when the authorization server already authenticated the subject.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] for a blank challenge, [`Error::Upstream`] when the admin API fails.
    #[instrument(skip(self))]
    pub async fn resolve(&self, challenge: &str) -> Result<Resolution, Error> {
        let challenge = require_challenge(RequestKind::Login, challenge)?;
        let info = self.admin.get_login_request(challenge).await?;

        if info.skip {
            debug!(subject = %info.subject, "login request skipped, accepting");

            let accept = AcceptLogin {
                subject: info.subject,
                remember: false,
                remember_for: 0,
                acr: None,
            };
            let redirect = self.admin.accept_login_request(challenge, &accept).await?;

            return Ok(Resolution::Redirect(redirect.redirect_to));
        }

        Ok(Resolution::NeedsUi(ui_url(
            &self.client_base_url,
            "login",
            &[("challenge", challenge)],
        )?))
    }

    /// Deny, or check credentials and accept; returns the upstream redirect.
    ///
    /// # Errors
    /// [`Error::Auth`] for an unknown email or a wrong password, plus the
    /// errors of [`LoginFlow::resolve`] and [`Error::Storage`].
    #[instrument(skip(self, submission), fields(challenge = %submission.challenge))]
    pub async fn submit(&self, submission: LoginSubmission) -> Result<String, Error> {
        let challenge = require_challenge(RequestKind::Login, &submission.challenge)?;

        if SubmitAction::from_submit(submission.submit.as_deref()) == SubmitAction::Deny {
            let redirect = self
                .admin
                .reject_login_request(challenge, &Rejection::access_denied())
                .await?;

            return Ok(redirect.redirect_to);
        }

        let email = normalize_email(submission.email.as_deref().unwrap_or_default());
        let user = self.users.find_by_email(&email).await?;

        let stored_hash = user.as_ref().map(|user| user.password_hash.clone());
        let verified = verify_credentials(stored_hash, submission.password).await;

        if !verified {
            debug!(known_user = user.is_some(), "credential check failed");
            return Err(Error::Auth);
        }

        let remember = submission.remember.unwrap_or(true);
        let accept = AcceptLogin {
            subject: email,
            remember,
            remember_for: if remember { REMEMBER_FOR_SECONDS } else { 0 },
            acr: Some(PASSWORD_ACR.to_string()),
        };
        let redirect = self.admin.accept_login_request(challenge, &accept).await?;

        Ok(redirect.redirect_to)
    }
}
