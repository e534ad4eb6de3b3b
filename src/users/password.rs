//! Argon2id password hashing.
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`), so parameters and salt
//! travel with the hash and older hashes keep verifying after tuning.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::OnceLock;
use tokio::task::spawn_blocking;
use tracing::error;

#[cfg(test)]
pub(crate) static VERIFICATIONS: std::sync::atomic::AtomicUsize =
    std::sync::atomic::AtomicUsize::new(0);

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Stand-in hash for unknown accounts, so they cost the same as wrong passwords.
fn dummy_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| {
        hash_password(&SecretString::from("tollgate-unknown-account".to_string()))
            .unwrap_or_else(|e| {
                error!("{}", e);
                String::new()
            })
    })
}

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
/// Returns an error string if the hasher rejects the input or parameters.
pub fn hash_password(password: &SecretString) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {e}"))
}

/// Check `password` against a stored PHC hash.
///
/// A malformed stored hash never verifies; it is logged since it points at bad data.
#[must_use]
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    #[cfg(test)]
    VERIFICATIONS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Check a login attempt off the async workers.
///
/// A missing account or password still runs one full verification against
/// a dummy hash and then fails.
pub async fn verify_credentials(
    stored_hash: Option<String>,
    password: Option<SecretString>,
) -> bool {
    let complete = stored_hash.is_some() && password.is_some();

    let verified = spawn_blocking(move || {
        let hash = stored_hash.as_deref().unwrap_or_else(|| dummy_hash());
        let password = password.as_ref().map_or("", |password| password.expose_secret());
        verify_password(hash, password)
    })
    .await
    .unwrap_or_else(|e| {
        error!("Password verification task failed: {}", e);
        false
    });

    complete && verified
}
