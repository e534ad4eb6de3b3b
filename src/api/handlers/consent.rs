use super::{found, ApiError, RedirectBody};
use crate::flow::{ConsentFlow, ConsentSubmission, GrantScope};
use axum::{
    extract::{Extension, Query},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ConsentChallenge {
    consent_challenge: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    #[serde(default)]
    challenge: String,
    /// `"Deny access"` rejects the consent request.
    submit: Option<String>,
    /// One scope or a list of scopes.
    grant_scope: Option<GrantScope>,
    remember: Option<bool>,
}

impl From<ConsentRequest> for ConsentSubmission {
    fn from(request: ConsentRequest) -> Self {
        Self {
            challenge: request.challenge,
            submit: request.submit,
            grant_scope: request.grant_scope,
            remember: request.remember,
        }
    }
}

#[utoipa::path(
    get,
    path = "/consent",
    params(ConsentChallenge),
    responses (
        (status = 302, description = "Redirect to the consent UI, or back to the authorization server when consent was skipped"),
        (status = 400, description = "Missing challenge or the admin API refused the request"),
    ),
    tag = "consent"
)]
#[instrument(skip(flow))]
pub async fn resolve(
    flow: Extension<ConsentFlow>,
    Query(query): Query<ConsentChallenge>,
) -> Result<Response, ApiError> {
    let resolution = flow
        .resolve(query.consent_challenge.as_deref().unwrap_or_default())
        .await?;

    found(&resolution)
}

#[utoipa::path(
    post,
    path = "/consent",
    request_body = ConsentRequest,
    responses (
        (status = 200, description = "Consent accepted or rejected", body = RedirectBody, content_type = "application/json"),
        (status = 400, description = "Missing payload, missing challenge or the admin API refused the request"),
    ),
    tag = "consent"
)]
#[instrument(skip(flow))]
pub async fn submit(
    flow: Extension<ConsentFlow>,
    payload: Option<Json<ConsentRequest>>,
) -> Result<Json<RedirectBody>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingPayload);
    };

    let redirect_uri = flow.submit(request.into()).await?;

    Ok(Json(redirect_uri.into()))
}
