use super::{found, ApiError, RedirectBody};
use crate::flow::LogoutFlow;
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
pub struct LogoutChallenge {
    logout_challenge: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct LogoutRequest {
    #[serde(default)]
    challenge: String,
}

#[utoipa::path(
    get,
    path = "/logout",
    params(LogoutChallenge),
    responses (
        (status = 302, description = "Redirect to the logout UI"),
        (status = 400, description = "Missing challenge or the admin API refused the request"),
    ),
    tag = "logout"
)]
#[instrument(skip(flow))]
pub async fn resolve(
    flow: Extension<LogoutFlow>,
    Query(query): Query<LogoutChallenge>,
) -> Result<Response, ApiError> {
    let resolution = flow
        .resolve(query.logout_challenge.as_deref().unwrap_or_default())
        .await?;

    found(&resolution)
}

#[utoipa::path(
    post,
    path = "/logout",
    request_body = LogoutRequest,
    responses (
        (status = 200, description = "Logout accepted", body = RedirectBody, content_type = "application/json"),
        (status = 400, description = "Missing payload, missing challenge or the admin API refused the request"),
    ),
    tag = "logout"
)]
#[instrument(skip(flow))]
pub async fn submit(
    flow: Extension<LogoutFlow>,
    payload: Option<Json<LogoutRequest>>,
) -> Result<Json<RedirectBody>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingPayload);
    };

    let redirect_uri = flow.submit(&request.challenge).await?;

    Ok(Json(redirect_uri.into()))
}
