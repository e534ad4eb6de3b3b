use super::{found, ApiError, RedirectBody};
use crate::flow::{LoginFlow, LoginSubmission};
use axum::{
    extract::{Extension, Query},
    response::Response,
    Json,
};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct LoginChallenge {
    login_challenge: Option<String>,
}

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    challenge: String,
    /// `"Deny access"` rejects the login.
    submit: Option<String>,
    email: Option<String>,
    #[schema(format = Password)]
    password: Option<String>,
    remember: Option<bool>,
}

impl From<LoginRequest> for LoginSubmission {
    fn from(request: LoginRequest) -> Self {
        Self {
            challenge: request.challenge,
            submit: request.submit,
            email: request.email,
            password: request.password.map(SecretString::from),
            remember: request.remember,
        }
    }
}

#[utoipa::path(
    get,
    path = "/login",
    params(LoginChallenge),
    responses (
        (status = 302, description = "Redirect to the login UI, or back to the authorization server when the login was skipped"),
        (status = 400, description = "Missing challenge or the admin API refused the request"),
    ),
    tag = "login"
)]
#[instrument(skip(flow))]
pub async fn resolve(
    flow: Extension<LoginFlow>,
    Query(query): Query<LoginChallenge>,
) -> Result<Response, ApiError> {
    let resolution = flow
        .resolve(query.login_challenge.as_deref().unwrap_or_default())
        .await?;

    found(&resolution)
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login accepted or rejected", body = RedirectBody, content_type = "application/json"),
        (status = 400, description = "Missing payload, missing challenge or the admin API refused the request"),
        (status = 401, description = "The username / password combination is not correct"),
    ),
    tag = "login"
)]
#[instrument(skip(flow, payload))]
pub async fn submit(
    flow: Extension<LoginFlow>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<RedirectBody>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingPayload);
    };

    let redirect_uri = flow.submit(request.into()).await?;

    Ok(Json(redirect_uri.into()))
}
