use super::{require_challenge, ui_url, Error, Resolution, SubmitAction, REMEMBER_FOR_SECONDS};
use crate::admin::{AcceptConsent, AdminApi, ConsentSession, Rejection, RequestKind};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

/// Scopes ticked in the consent UI; a single scope may arrive as a bare string.
#[derive(ToSchema, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum GrantScope {
    One(String),
    Many(Vec<String>),
}

impl GrantScope {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(scope) => vec![scope],
            Self::Many(scopes) => scopes,
        }
    }
}

/// Absent means nothing was ticked.
#[must_use]
pub fn normalize_grant_scope(scope: Option<GrantScope>) -> Vec<String> {
    scope.map(GrantScope::into_vec).unwrap_or_default()
}

/// What the consent UI posts back.
#[derive(Debug, Clone, Default)]
pub struct ConsentSubmission {
    pub challenge: String,
    pub submit: Option<String>,
    pub grant_scope: Option<GrantScope>,
    pub remember: Option<bool>,
}

#[derive(Clone)]
pub struct ConsentFlow {
    admin: Arc<dyn AdminApi>,
    client_base_url: Url,
}

impl ConsentFlow {
    #[must_use]
    pub fn new(admin: Arc<dyn AdminApi>, client_base_url: Url) -> Self {
        Self {
            admin,
            client_base_url,
        }
    }

    /// Grant everything requested when consent was already given, else defer to the UI.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] for a blank challenge, [`Error::Upstream`] when the admin API fails.
    #[instrument(skip(self))]
    pub async fn resolve(&self, challenge: &str) -> Result<Resolution, Error> {
        let challenge = require_challenge(RequestKind::Consent, challenge)?;
        let info = self.admin.get_consent_request(challenge).await?;

        if info.skip {
            debug!(subject = %info.subject, "consent request skipped, accepting");

            let accept = AcceptConsent {
                session: ConsentSession::with_email(&info.subject),
                grant_scope: info.requested_scope,
                grant_access_token_audience: info.requested_access_token_audience,
                remember: false,
                remember_for: 0,
            };
            let redirect = self.admin.accept_consent_request(challenge, &accept).await?;

            return Ok(Resolution::Redirect(redirect.redirect_to));
        }

        Ok(Resolution::NeedsUi(ui_url(
            &self.client_base_url,
            "consent",
            &[("challenge", challenge), ("clientName", info.client_name())],
        )?))
    }

    /// Reject, or accept the scopes the request currently asks for.
    ///
    /// The submitted `grant_scope` is logged but the accepted scopes are the
    /// freshly fetched `requested_scope`.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] for a blank challenge, [`Error::Upstream`] when the admin API fails.
    #[instrument(skip(self, submission), fields(challenge = %submission.challenge))]
    pub async fn submit(&self, submission: ConsentSubmission) -> Result<String, Error> {
        let challenge = require_challenge(RequestKind::Consent, &submission.challenge)?;

        if SubmitAction::from_submit(submission.submit.as_deref()) == SubmitAction::Deny {
            let redirect = self
                .admin
                .reject_consent_request(challenge, &Rejection::access_denied())
                .await?;

            return Ok(redirect.redirect_to);
        }

        let submitted = normalize_grant_scope(submission.grant_scope);
        let info = self.admin.get_consent_request(challenge).await?;

        debug!(
            submitted = ?submitted,
            requested = ?info.requested_scope,
            "accepting consent request"
        );

        let accept = AcceptConsent {
            grant_scope: info.requested_scope,
            grant_access_token_audience: info.requested_access_token_audience,
            remember: submission.remember.unwrap_or(true),
            remember_for: REMEMBER_FOR_SECONDS,
            session: ConsentSession::default(),
        };
        let redirect = self.admin.accept_consent_request(challenge, &accept).await?;

        Ok(redirect.redirect_to)
    }
}
