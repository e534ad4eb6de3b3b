pub mod consent;
pub mod health;
pub mod login;
pub mod logout;
pub mod user;

use crate::{
    admin,
    flow::{self, Resolution},
    users::StorageError,
};
use axum::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

/// Body returned by every POST decision endpoint.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectBody {
    pub redirect_uri: String,
}

impl From<String> for RedirectBody {
    fn from(redirect_uri: String) -> Self {
        Self { redirect_uri }
    }
}

#[derive(Debug)]
pub enum ApiError {
    MissingPayload,
    Flow(flow::Error),
}

impl From<flow::Error> for ApiError {
    fn from(err: flow::Error) -> Self {
        Self::Flow(err)
    }
}

impl From<admin::Error> for ApiError {
    fn from(err: admin::Error) -> Self {
        Self::Flow(err.into())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Flow(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let flow_error = match self {
            Self::MissingPayload => {
                return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response()
            }
            Self::Flow(err) => err,
        };

        match flow_error {
            flow::Error::InvalidInput(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            flow::Error::Upstream(admin::Error::Status {
                status, message, ..
            }) => {
                warn!(status, "Admin API refused the request: {}", message);
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            flow::Error::Upstream(err) => {
                error!("Admin API call failed: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Authorization server unavailable".to_string(),
                )
                    .into_response()
            }
            err @ flow::Error::Auth => (StatusCode::UNAUTHORIZED, err.to_string()).into_response(),
            flow::Error::Storage(err @ StorageError::Duplicate) => {
                (StatusCode::CONFLICT, err.to_string()).into_response()
            }
            flow::Error::Storage(err) => {
                error!("User store failure: {}", err);
                internal_error()
            }
            flow::Error::Internal(message) => {
                error!("Internal error: {}", message);
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
        .into_response()
}

/// `302 Found` to wherever the resolver decided.
fn found(resolution: &Resolution) -> Result<Response, ApiError> {
    let location = HeaderValue::from_str(resolution.url()).map_err(|e| {
        ApiError::Flow(flow::Error::Internal(format!(
            "Redirect target is not a valid header value: {e}"
        )))
    })?;

    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}
