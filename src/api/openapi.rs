use super::{
    handlers::{consent, health, login, logout, user},
    DEFAULT_PREFIX,
};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

/// The document for the default route prefix.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router(DEFAULT_PREFIX).split_for_parts();
    openapi
}

/// Routes that drive both the server and the `OpenAPI` document.
///
/// The challenge endpoints live under `prefix`; `/health` always sits at the root.
pub(crate) fn api_router(prefix: &str) -> OpenApiRouter {
    let flows = OpenApiRouter::new()
        .routes(routes!(login::resolve, login::submit))
        .routes(routes!(consent::resolve, consent::submit))
        .routes(routes!(logout::resolve, logout::submit))
        .routes(routes!(user::create));

    let router = OpenApiRouter::with_openapi(cargo_openapi()).routes(routes!(health::health));

    if prefix.is_empty() {
        router.merge(flows)
    } else {
        router.nest(prefix, flows)
    }
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![
            tag("login", "Login challenge resolution"),
            tag("consent", "Consent challenge resolution"),
            tag("logout", "Logout challenge resolution"),
            tag("user", "Local user accounts"),
            tag("health", "Service health"),
        ]))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        Some(value.trim()).filter(|v| !v.is_empty())
    }

    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
