//! HTTP adapter: routes, middleware and server start-up.

use crate::{
    admin::{AdminApi, AdminConfig, HttpAdminClient},
    flow::{ConsentFlow, LoginFlow, LogoutFlow},
    users::{PgUserStore, UserStore},
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    routing::get,
    Extension, Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod handlers;
mod openapi;

#[cfg(test)]
mod tests;

pub use openapi::openapi;

pub const DEFAULT_PORT: u16 = 5002;
pub const DEFAULT_PREFIX: &str = "/api/v1";

/// Origin of the development UI, always allowed by CORS.
pub const DEV_UI_ORIGIN: &str = "http://localhost:4002";

#[derive(Debug, Clone)]
pub struct Config {
    port: u16,
    dsn: SecretString,
    prefix: String,
    client_base_url: Url,
    cors_origin: Option<String>,
}

impl Config {
    /// # Errors
    /// Returns an error if `prefix` does not start with `/`.
    pub fn new(port: u16, dsn: SecretString, prefix: &str, client_base_url: Url) -> Result<Self> {
        Ok(Self {
            port,
            dsn,
            prefix: normalize_prefix(prefix)?,
            client_base_url,
            cors_origin: None,
        })
    }

    #[must_use]
    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn client_base_url(&self) -> &Url {
        &self.client_base_url
    }
}

/// `""` for the root, otherwise `/segment[/segment...]` without a trailing slash.
fn normalize_prefix(prefix: &str) -> Result<String> {
    let trimmed = prefix.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return Ok(String::new());
    }

    if !trimmed.starts_with('/') {
        return Err(anyhow!("Route prefix must start with '/': {prefix}"));
    }

    Ok(trimmed.to_string())
}

/// Build the application with every route, layer and extension wired in.
///
/// # Errors
/// Returns an error if a CORS origin cannot be parsed.
pub fn app(config: &Config, admin: Arc<dyn AdminApi>, users: Arc<dyn UserStore>) -> Result<Router> {
    let login = LoginFlow::new(admin.clone(), users.clone(), config.client_base_url.clone());
    let consent = ConsentFlow::new(admin.clone(), config.client_base_url.clone());
    let logout = LogoutFlow::new(admin.clone(), config.client_base_url.clone());

    let mut origins = vec![HeaderValue::from_static(DEV_UI_ORIGIN)];
    if let Some(origin) = &config.cors_origin {
        origins.push(origin_header(origin)?);
    }

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true);

    let (router, openapi) = openapi::api_router(&config.prefix).split_for_parts();
    let openapi = Arc::new(openapi);

    let app = router
        .route(
            "/openapi.json",
            get(|doc: Extension<Arc<utoipa::openapi::OpenApi>>| async move {
                Json(doc.0.as_ref().clone())
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(login))
                .layer(Extension(consent))
                .layer(Extension(logout))
                .layer(Extension(admin))
                .layer(Extension(users))
                .layer(Extension(openapi)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(config: Config, admin_config: AdminConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(config.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let admin: Arc<dyn AdminApi> = Arc::new(HttpAdminClient::new(admin_config)?);
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));

    let app = app(&config, admin, users)?;

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!("Listening on [::]:{}", config.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn origin_header(base_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(base_url).with_context(|| format!("Invalid CORS origin: {base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}
