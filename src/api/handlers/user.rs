use super::ApiError;
use crate::{
    flow,
    users::{prepare_user, CreateUserError, UserStore},
};
use axum::{extract::Extension, http::StatusCode, Json};
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Body of `POST /user`; any extra field is stored as profile data.
#[derive(ToSchema, Debug)]
pub struct UserCreate {
    email: String,
    #[schema(value_type = String, format = Password)]
    password: SecretString,
}

impl UserCreate {
    /// Take `email` and `password` out of the JSON object, leaving the profile behind.
    fn take(fields: &mut Map<String, Value>) -> Result<Self, CreateUserError> {
        let email = take_string(fields, "email").ok_or(CreateUserError::InvalidEmail)?;
        let password = take_string(fields, "password")
            .map(SecretString::from)
            .ok_or(CreateUserError::InvalidPassword)?;

        Ok(Self { email, password })
    }
}

impl From<CreateUserError> for ApiError {
    fn from(err: CreateUserError) -> Self {
        match err {
            CreateUserError::Hash(message) => Self::Flow(flow::Error::Internal(message)),
            err => Self::Flow(flow::Error::InvalidInput(err.to_string())),
        }
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

#[utoipa::path(
    post,
    path = "/user",
    request_body = UserCreate,
    responses (
        (status = 200, description = "User created"),
        (status = 400, description = "Missing payload, invalid email or empty password"),
        (status = 409, description = "User already exists"),
    ),
    tag = "user"
)]
#[instrument(skip(users, payload))]
pub async fn create(
    users: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<Map<String, Value>>>,
) -> Result<StatusCode, ApiError> {
    let Some(Json(mut fields)) = payload else {
        return Err(ApiError::MissingPayload);
    };

    let request = UserCreate::take(&mut fields)?;

    let user = prepare_user(&request.email, &request.password, fields)?;
    let created = users.create(user).await?;

    debug!(user_id = %created.id, "user created");

    Ok(StatusCode::OK)
}
