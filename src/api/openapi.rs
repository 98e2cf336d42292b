use super::handlers::{
    auth::{session, signin, signup},
    health,
};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Routes registered here are served and documented. `/` is added outside.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(signup::signup))
        .routes(routes!(signin::signin))
        .routes(routes!(session::signout))
        .routes(routes!(session::refresh))
        .routes(routes!(session::invalidate))
        .routes(routes!(session::me))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Signup, signin and session tokens".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service and dependency status".to_string());

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![auth_tag, health_tag]))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

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

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => (non_empty(name), non_empty(rest.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
