use super::{
    AcceptConsent, AcceptLogin, AdminApi, ChallengeInfo, Error, RedirectTo, Rejection, RequestKind,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

pub const DEFAULT_ADMIN_URL: &str = "http://localhost:4445";
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
const FETCH_BACKOFF_BASE_MILLIS: u64 = 100;
const FETCH_BACKOFF_MAX_MILLIS: u64 = 2_000;

/// Upper bound for `--admin-fetch-attempts`.
pub const MAX_FETCH_ATTEMPTS: u32 = 10;
const REQUESTS_PATH: &str = "oauth2/auth/requests";

#[derive(Clone)]
pub struct AdminConfig {
    base_url: Url,
    username: Option<String>,
    password: Option<SecretString>,
    timeout: Duration,
    fetch_attempts: u32,
}

impl AdminConfig {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid admin API URL: {base_url}"))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported admin API URL scheme: {}", base_url.scheme());
        }

        // Relative joins must keep a path prefix such as `/admin`
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            username: None,
            password: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
        })
    }

    #[must_use]
    pub fn with_basic_auth(mut self, username: String, password: Option<SecretString>) -> Self {
        self.username = Some(username);
        self.password = password;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts.clamp(1, MAX_FETCH_ATTEMPTS);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn fetch_attempts(&self) -> u32 {
        self.fetch_attempts
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("fetch_attempts", &self.fetch_attempts)
            .finish()
    }
}

/// `AdminApi` over HTTP(S).
///
/// GET fetches are retried on transport errors and 5xx answers with
/// exponential backoff; accept/reject calls are sent exactly once.
#[derive(Clone, Debug)]
pub struct HttpAdminClient {
    client: Client,
    config: AdminConfig,
}

impl HttpAdminClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build admin API HTTP client")?;

        Ok(Self { client, config })
    }

    fn request_url(
        &self,
        kind: RequestKind,
        action: Option<&str>,
        challenge: &str,
    ) -> Result<Url, Error> {
        let path = match action {
            Some(action) => format!("{REQUESTS_PATH}/{}/{action}", kind.as_str()),
            None => format!("{REQUESTS_PATH}/{}", kind.as_str()),
        };

        let mut url = self.config.base_url.join(&path)?;
        url.query_pairs_mut()
            .append_pair(kind.challenge_param(), challenge);

        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(
                username,
                self.config
                    .password
                    .as_ref()
                    .map(|password| password.expose_secret().to_string()),
            ),
            None => request,
        }
    }

    async fn send<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Response, Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut request = self.authorize(self.client.request(method, url));

        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(Error::Request)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, kind: RequestKind, challenge: &str) -> Result<ChallengeInfo, Error> {
        let url = self.request_url(kind, None, challenge)?;

        let mut attempt = 1;
        loop {
            let result = match self.send::<()>(Method::GET, url.clone(), None).await {
                Ok(response) => read_json(response).await,
                Err(err) => Err(err),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.config.fetch_attempts => {
                    let backoff = fetch_backoff(attempt);

                    warn!(
                        "Fetching {} request failed (attempt {}): {}, retrying in {:?}",
                        kind.as_str(),
                        attempt,
                        err,
                        backoff
                    );

                    sleep(backoff).await;
                    attempt += 1;
                }

                other => return other,
            }
        }
    }

    #[instrument(skip(self, body))]
    async fn decide<B>(
        &self,
        kind: RequestKind,
        action: &str,
        challenge: &str,
        body: Option<&B>,
    ) -> Result<RedirectTo, Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.request_url(kind, Some(action), challenge)?;

        debug!("{} {} request", action, kind.as_str());

        let response = self.send(Method::PUT, url, body).await?;

        read_json(response).await
    }
}

/// Delay before retrying after failed `attempt` (1-based): doubles from 100 ms, capped at 2 s.
fn fetch_backoff(attempt: u32) -> Duration {
    let millis = FETCH_BACKOFF_BASE_MILLIS
        .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
        .min(FETCH_BACKOFF_MAX_MILLIS);

    Duration::from_millis(millis)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();
    let body = response.text().await.map_err(Error::Request)?;

    if !status.is_success() {
        let message = upstream_message(&body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

        debug!("Admin API returned {}: {}", status, message);

        return Err(Error::Status {
            status: status.as_u16(),
            message,
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Pull a human readable message out of an admin API error document.
fn upstream_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    json["error_description"]
        .as_str()
        .or_else(|| json["error"]["message"].as_str())
        .or_else(|| json["message"].as_str())
        .or_else(|| json["error"].as_str())
        .map(ToString::to_string)
}

#[async_trait]
impl AdminApi for HttpAdminClient {
    async fn get_login_request(&self, challenge: &str) -> Result<ChallengeInfo, Error> {
        self.fetch(RequestKind::Login, challenge).await
    }

    async fn accept_login_request(
        &self,
        challenge: &str,
        body: &AcceptLogin,
    ) -> Result<RedirectTo, Error> {
        self.decide(RequestKind::Login, "accept", challenge, Some(body))
            .await
    }

    async fn reject_login_request(
        &self,
        challenge: &str,
        body: &Rejection,
    ) -> Result<RedirectTo, Error> {
        self.decide(RequestKind::Login, "reject", challenge, Some(body))
            .await
    }

    async fn get_consent_request(&self, challenge: &str) -> Result<ChallengeInfo, Error> {
        self.fetch(RequestKind::Consent, challenge).await
    }

    async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsent,
    ) -> Result<RedirectTo, Error> {
        self.decide(RequestKind::Consent, "accept", challenge, Some(body))
            .await
    }

    async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &Rejection,
    ) -> Result<RedirectTo, Error> {
        self.decide(RequestKind::Consent, "reject", challenge, Some(body))
            .await
    }

    async fn get_logout_request(&self, challenge: &str) -> Result<ChallengeInfo, Error> {
        self.fetch(RequestKind::Logout, challenge).await
    }

    async fn accept_logout_request(&self, challenge: &str) -> Result<RedirectTo, Error> {
        self.decide::<()>(RequestKind::Logout, "accept", challenge, None)
            .await
    }

    #[instrument(skip(self))]
    async fn health(&self) -> Result<(), Error> {
        let url = self.config.base_url.join("health/alive")?;
        let response = self.send::<()>(Method::GET, url, None).await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
                body: String::new(),
            })
        }
    }
}
