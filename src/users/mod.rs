//! Credential store: user records, email lookups and account creation.

pub mod password;
pub mod storage;

pub use self::storage::PgUserStore;

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub profile: Map<String, Value>,
}

/// A user ready to be inserted; the password is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub profile: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("User already exists")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreateUserError {
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("{0}")]
    Hash(String),
}

/// Persistence for user records. Users are created once and then only read.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Insert a user; a taken email yields [`StorageError::Duplicate`].
    async fn create(&self, user: NewUser) -> Result<User, StorageError>;

    /// Round-trip to the backing store, used by `/health`.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate and hash the input into a [`NewUser`].
///
/// Extra request fields are kept as the user's profile.
///
/// # Errors
/// Returns [`CreateUserError`] for an invalid email, an empty password or a hashing failure.
#[instrument(skip(password, profile))]
pub fn prepare_user(
    email: &str,
    password: &SecretString,
    profile: Map<String, Value>,
) -> Result<NewUser, CreateUserError> {
    let email = normalize_email(email);

    if !valid_email(&email) {
        return Err(CreateUserError::InvalidEmail);
    }

    if password.expose_secret().is_empty() {
        return Err(CreateUserError::InvalidPassword);
    }

    let password_hash = self::password::hash_password(password).map_err(CreateUserError::Hash)?;

    debug!("prepared user record");

    Ok(NewUser {
        email,
        password_hash,
        profile,
    })
}
