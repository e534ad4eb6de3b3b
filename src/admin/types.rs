//! Wire types exchanged with the authorization server admin API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub const ACCESS_DENIED: &str = "access_denied";
pub const ACCESS_DENIED_DESCRIPTION: &str = "The resource owner denied the request";

/// The admin API sends `null` for empty lists and unset strings.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuth2Client {
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_name: String,
}

/// A pending login, consent or logout request as described by the admin API.
///
/// Logout requests carry neither `skip` nor scopes; those decode to their
/// empty defaults.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenge: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skip: bool,
    #[serde(default)]
    pub client: Option<OAuth2Client>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_scope: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_access_token_audience: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_url: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChallengeInfo {
    /// Client display name, empty when the request has no client attached.
    #[must_use]
    pub fn client_name(&self) -> &str {
        self.client
            .as_ref()
            .map_or("", |client| client.client_name.as_str())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AcceptLogin {
    pub subject: String,
    pub remember: bool,
    pub remember_for: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,
}

/// Claims copied into the access token (introspection) and the ID token.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentSession {
    #[schema(value_type = Object)]
    pub access_token: Map<String, Value>,
    #[schema(value_type = Object)]
    pub id_token: Map<String, Value>,
}

impl ConsentSession {
    /// Session exposing the subject as the `email` claim in both tokens.
    #[must_use]
    pub fn with_email(email: &str) -> Self {
        let mut claims = Map::new();
        claims.insert("email".to_string(), Value::String(email.to_string()));
        Self {
            access_token: claims.clone(),
            id_token: claims,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AcceptConsent {
    pub grant_scope: Vec<String>,
    pub grant_access_token_audience: Vec<String>,
    pub remember: bool,
    pub remember_for: u64,
    pub session: ConsentSession,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub error: String,
    pub error_description: String,
}

impl Rejection {
    /// The rejection sent when the resource owner clicks "Deny access".
    #[must_use]
    pub fn access_denied() -> Self {
        Self {
            error: ACCESS_DENIED.to_string(),
            error_description: ACCESS_DENIED_DESCRIPTION.to_string(),
        }
    }
}

/// Where the admin API wants the user agent to go next. Relayed, never parsed.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RedirectTo {
    pub redirect_to: String,
}
