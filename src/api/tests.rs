//! End-to-end handler tests against the full router with in-memory doubles.

use super::{app, normalize_prefix, Config, DEFAULT_PREFIX};
use crate::{
    admin::{AcceptConsent, AcceptLogin, ConsentSession, Rejection},
    test_support::{challenge_info, redirect, AdminCall, FakeAdmin, MemoryUserStore},
};
use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, LOCATION},
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

struct TestApp {
    router: Router,
    admin: Arc<FakeAdmin>,
    users: Arc<MemoryUserStore>,
}

impl TestApp {
    fn new(users: MemoryUserStore) -> Result<Self> {
        let config = Config::new(
            5002,
            SecretString::from("postgres://unused".to_string()),
            DEFAULT_PREFIX,
            Url::parse("http://localhost:4002")?,
        )?;
        let admin = Arc::new(FakeAdmin::new());
        let users = Arc::new(users);
        let router = app(&config, admin.clone(), users.clone())?;

        Ok(Self {
            router,
            admin,
            users,
        })
    }

    async fn get(&self, uri: &str) -> Result<Response> {
        Ok(self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?)
    }

    async fn post(&self, uri: &str, payload: &Value) -> Result<Response> {
        self.post_raw(uri, payload.to_string()).await
    }

    async fn post_raw(&self, uri: &str, body: String) -> Result<Response> {
        Ok(self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body))?,
            )
            .await?)
    }
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

async fn body_json(response: Response) -> Result<Value> {
    Ok(serde_json::from_str(&body_text(response).await?)?)
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn post_login_with_valid_credentials_accepts() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new().with_user("a@x.com", "secret"))?;

    let response = app
        .post(
            "/api/v1/login",
            &json!({
                "challenge": "c1",
                "submit": "Log in",
                "email": "a@x.com",
                "password": "secret"
            }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await?,
        json!({ "redirectUri": redirect("login", "accept", "c1") })
    );
    assert_eq!(
        app.admin.decisions(),
        vec![AdminCall::AcceptLogin(
            "c1".to_string(),
            AcceptLogin {
                subject: "a@x.com".to_string(),
                remember: true,
                remember_for: 3600,
                acr: Some("0".to_string()),
            }
        )]
    );
    Ok(())
}

#[tokio::test]
async fn post_consent_deny_rejects_and_relays_redirect() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app
        .post(
            "/api/v1/consent",
            &json!({ "challenge": "c2", "submit": "Deny access" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await?,
        json!({ "redirectUri": redirect("consent", "reject", "c2") })
    );
    assert_eq!(
        app.admin.decisions(),
        vec![AdminCall::RejectConsent(
            "c2".to_string(),
            Rejection::access_denied()
        )]
    );
    Ok(())
}

#[tokio::test]
async fn post_consent_accept_grants_requested_scope() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;
    app.admin.set_consent(challenge_info("c2", "a@x.com", false));

    let response = app
        .post(
            "/api/v1/consent",
            &json!({ "challenge": "c2", "submit": "Allow access", "grantScope": "openid" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await?,
        json!({ "redirectUri": redirect("consent", "accept", "c2") })
    );
    assert_eq!(
        app.admin.decisions(),
        vec![AdminCall::AcceptConsent(
            "c2".to_string(),
            AcceptConsent {
                grant_scope: vec!["openid".to_string(), "offline".to_string()],
                grant_access_token_audience: vec!["https://api.example".to_string()],
                remember: true,
                remember_for: 3600,
                session: ConsentSession::default(),
            }
        )]
    );
    Ok(())
}

#[tokio::test]
async fn post_login_with_wrong_password_is_unauthorized() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new().with_user("a@x.com", "secret"))?;

    let response = app
        .post(
            "/api/v1/login",
            &json!({ "challenge": "c1", "email": "a@x.com", "password": "nope" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_text(response).await?,
        "The username / password combination is not correct"
    );
    assert!(app.admin.decisions().is_empty());
    Ok(())
}

#[tokio::test]
async fn get_login_redirects_to_ui() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;
    app.admin.set_login(challenge_info("c1", "", false));

    let response = app.get("/api/v1/login?login_challenge=c1").await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        Some("http://localhost:4002/login?challenge=c1")
    );
    Ok(())
}

#[tokio::test]
async fn get_login_skip_redirects_upstream() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;
    app.admin.set_login(challenge_info("c1", "a@x.com", true));

    let response = app.get("/api/v1/login?login_challenge=c1").await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        Some(redirect("login", "accept", "c1").as_str())
    );
    Ok(())
}

#[tokio::test]
async fn get_consent_redirects_with_client_name() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;
    app.admin.set_consent(challenge_info("c2", "a@x.com", false));

    let response = app.get("/api/v1/consent?consent_challenge=c2").await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        Some("http://localhost:4002/consent?challenge=c2&clientName=My+App")
    );
    Ok(())
}

#[tokio::test]
async fn get_without_challenge_is_bad_request() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app.get("/api/v1/logout").await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await?,
        "Expected a logout challenge to be set but received none."
    );
    assert!(app.admin.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn upstream_refusal_is_bad_request_with_message() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app.get("/api/v1/consent?consent_challenge=gone").await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await?,
        "Unable to locate the requested resource"
    );
    Ok(())
}

#[tokio::test]
async fn logout_round_trip() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;
    app.admin.set_logout(challenge_info("c3", "a@x.com", false));

    let response = app.get("/api/v1/logout?logout_challenge=c3").await?;
    assert_eq!(
        location(&response),
        Some("http://localhost:4002/logout?challenge=c3")
    );

    let response = app
        .post("/api/v1/logout", &json!({ "challenge": "c3" }))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await?,
        json!({ "redirectUri": redirect("logout", "accept", "c3") })
    );
    Ok(())
}

#[tokio::test]
async fn missing_payload_is_bad_request() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app.post_raw("/api/v1/login", "not json".to_string()).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await?, "Missing payload");
    Ok(())
}

#[tokio::test]
async fn create_user_stores_hash_and_profile() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app
        .post(
            "/api/v1/user",
            &json!({ "email": " New@X.com", "password": "secret", "name": "Alice" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.is_empty());

    let user = app.users.get("new@x.com");
    assert!(user.is_some());
    if let Some(user) = user {
        assert_ne!(user.password_hash, "secret");
        assert_eq!(user.profile.get("name"), Some(&json!("Alice")));
        assert!(!user.profile.contains_key("password"));
    }

    let duplicate = app
        .post(
            "/api/v1/user",
            &json!({ "email": "new@x.com", "password": "other" }),
        )
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn create_user_rejects_invalid_email() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app
        .post("/api/v1/user", &json!({ "email": "nope", "password": "secret" }))
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await?, "Invalid email");
    Ok(())
}

#[tokio::test]
async fn health_reports_dependencies() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app.get("/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let health = body_json(response).await?;
    assert_eq!(health["database"], "ok");
    assert_eq!(health["admin_api"], "ok");

    app.admin.set_healthy(false);
    let response = app.get("/health").await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await?["admin_api"], "error");

    app.admin.set_healthy(true);
    app.users.set_offline(true);
    let response = app.get("/health").await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn responses_carry_request_id() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app.get("/health").await?;

    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let app = TestApp::new(MemoryUserStore::new())?;

    let response = app.get("/openapi.json").await?;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await?;
    assert!(doc["paths"]["/api/v1/login"].is_object());
    Ok(())
}

#[test]
fn prefix_normalization() -> Result<()> {
    assert_eq!(normalize_prefix("/api/v1/")?, "/api/v1");
    assert_eq!(normalize_prefix(" / ")?, "");
    assert_eq!(normalize_prefix("")?, "");
    assert!(normalize_prefix("api").is_err());
    Ok(())
}
