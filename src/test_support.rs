//! In-memory doubles for the admin API and the user store.

#![allow(clippy::unwrap_used)]

use crate::{
    admin::{
        self, AcceptConsent, AcceptLogin, AdminApi, ChallengeInfo, OAuth2Client, RedirectTo,
        Rejection,
    },
    users::{password, NewUser, StorageError, User, UserStore},
};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Map;
use std::{collections::HashMap, sync::Mutex};
use uuid::Uuid;

pub const UPSTREAM: &str = "https://auth.example";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    GetLogin(String),
    AcceptLogin(String, AcceptLogin),
    RejectLogin(String, Rejection),
    GetConsent(String),
    AcceptConsent(String, AcceptConsent),
    RejectConsent(String, Rejection),
    GetLogout(String),
    AcceptLogout(String),
}

impl AdminCall {
    /// True for calls that finalize a challenge.
    pub fn is_decision(&self) -> bool {
        !matches!(
            self,
            Self::GetLogin(_) | Self::GetConsent(_) | Self::GetLogout(_)
        )
    }
}

/// Records every call; answers fetches with the configured request info.
#[derive(Default)]
pub struct FakeAdmin {
    login: Mutex<Option<ChallengeInfo>>,
    consent: Mutex<Option<ChallengeInfo>>,
    logout: Mutex<Option<ChallengeInfo>>,
    failure: Mutex<Option<(u16, String)>>,
    healthy: Mutex<bool>,
    calls: Mutex<Vec<AdminCall>>,
}

impl FakeAdmin {
    pub fn new() -> Self {
        let admin = Self::default();
        *admin.healthy.lock().unwrap() = true;
        admin
    }

    pub fn set_login(&self, info: ChallengeInfo) {
        *self.login.lock().unwrap() = Some(info);
    }

    pub fn set_consent(&self, info: ChallengeInfo) {
        *self.consent.lock().unwrap() = Some(info);
    }

    pub fn set_logout(&self, info: ChallengeInfo) {
        *self.logout.lock().unwrap() = Some(info);
    }

    /// Every subsequent call answers with this status.
    pub fn fail_with(&self, status: u16, message: &str) {
        *self.failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = healthy;
    }

    pub fn calls(&self) -> Vec<AdminCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn decisions(&self) -> Vec<AdminCall> {
        self.calls()
            .into_iter()
            .filter(AdminCall::is_decision)
            .collect()
    }

    fn record(&self, call: AdminCall) -> Result<(), admin::Error> {
        self.calls.lock().unwrap().push(call);

        match self.failure.lock().unwrap().clone() {
            Some((status, message)) => Err(admin::Error::Status {
                status,
                body: message.clone(),
                message,
            }),
            None => Ok(()),
        }
    }

    fn info(slot: &Mutex<Option<ChallengeInfo>>, challenge: &str) -> Result<ChallengeInfo, admin::Error> {
        slot.lock()
            .unwrap()
            .clone()
            .filter(|info| info.challenge == challenge)
            .ok_or_else(|| admin::Error::Status {
                status: 404,
                message: "Unable to locate the requested resource".to_string(),
                body: String::new(),
            })
    }
}

pub fn redirect(kind: &str, action: &str, challenge: &str) -> String {
    format!("{UPSTREAM}/{kind}/{action}?challenge={challenge}")
}

fn redirect_to(kind: &str, action: &str, challenge: &str) -> RedirectTo {
    RedirectTo {
        redirect_to: redirect(kind, action, challenge),
    }
}

#[async_trait]
impl AdminApi for FakeAdmin {
    async fn get_login_request(&self, challenge: &str) -> Result<ChallengeInfo, admin::Error> {
        self.record(AdminCall::GetLogin(challenge.to_string()))?;
        Self::info(&self.login, challenge)
    }

    async fn accept_login_request(
        &self,
        challenge: &str,
        body: &AcceptLogin,
    ) -> Result<RedirectTo, admin::Error> {
        self.record(AdminCall::AcceptLogin(challenge.to_string(), body.clone()))?;
        Ok(redirect_to("login", "accept", challenge))
    }

    async fn reject_login_request(
        &self,
        challenge: &str,
        body: &Rejection,
    ) -> Result<RedirectTo, admin::Error> {
        self.record(AdminCall::RejectLogin(challenge.to_string(), body.clone()))?;
        Ok(redirect_to("login", "reject", challenge))
    }

    async fn get_consent_request(&self, challenge: &str) -> Result<ChallengeInfo, admin::Error> {
        self.record(AdminCall::GetConsent(challenge.to_string()))?;
        Self::info(&self.consent, challenge)
    }

    async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsent,
    ) -> Result<RedirectTo, admin::Error> {
        self.record(AdminCall::AcceptConsent(challenge.to_string(), body.clone()))?;
        Ok(redirect_to("consent", "accept", challenge))
    }

    async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &Rejection,
    ) -> Result<RedirectTo, admin::Error> {
        self.record(AdminCall::RejectConsent(challenge.to_string(), body.clone()))?;
        Ok(redirect_to("consent", "reject", challenge))
    }

    async fn get_logout_request(&self, challenge: &str) -> Result<ChallengeInfo, admin::Error> {
        self.record(AdminCall::GetLogout(challenge.to_string()))?;
        Self::info(&self.logout, challenge)
    }

    async fn accept_logout_request(&self, challenge: &str) -> Result<RedirectTo, admin::Error> {
        self.record(AdminCall::AcceptLogout(challenge.to_string()))?;
        Ok(redirect_to("logout", "accept", challenge))
    }

    async fn health(&self) -> Result<(), admin::Error> {
        if *self.healthy.lock().unwrap() {
            Ok(())
        } else {
            Err(admin::Error::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
                body: String::new(),
            })
        }
    }
}

/// A pending request for `challenge` with the given skip flag.
pub fn challenge_info(challenge: &str, subject: &str, skip: bool) -> ChallengeInfo {
    ChallengeInfo {
        challenge: challenge.to_string(),
        subject: subject.to_string(),
        skip,
        client: Some(OAuth2Client {
            client_id: "web".to_string(),
            client_name: "My App".to_string(),
        }),
        requested_scope: vec!["openid".to_string(), "offline".to_string()],
        requested_access_token_audience: vec!["https://api.example".to_string()],
        request_url: format!("{UPSTREAM}/oauth2/auth?client_id=web"),
        session_id: None,
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
    offline: Mutex<bool>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a user with a real Argon2 hash of `plaintext`.
    pub fn with_user(self, email: &str, plaintext: &str) -> Self {
        let hash = password::hash_password(&SecretString::from(plaintext.to_string())).unwrap();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash,
            profile: Map::new(),
        };
        self.users.lock().unwrap().insert(email.to_string(), user);
        self
    }

    /// Fail every call as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn get(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().get(email).cloned()
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if *self.offline.lock().unwrap() {
            Err(StorageError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        self.check_online()?;
        Ok(self.users.lock().unwrap().get(email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        self.check_online()?;
        let mut users = self.users.lock().unwrap();

        if users.contains_key(&user.email) {
            return Err(StorageError::Duplicate);
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            profile: user.profile,
        };
        users.insert(created.email.clone(), created.clone());
        Ok(created)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_online()
    }
}
