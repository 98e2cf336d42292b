use super::auth::AuthState;
use crate::GIT_COMMIT_HASH;
use crate::auth::error::bounded;
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
    ledger: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database and revocation ledger are reachable", body = [Health]),
        (status = 503, description = "Database or revocation ledger is unreachable", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let timeout = auth_state.timeout();
    let (database, ledger) = tokio::join!(
        bounded("store.ping", timeout, auth_state.store().ping()),
        bounded("ledger.ping", timeout, auth_state.ledger().ping()),
    );

    if let Err(err) = &database {
        error!("Database health check failed: {}", err);
    }
    if let Err(err) = &ledger {
        error!("Ledger health check failed: {}", err);
    }
    let is_healthy = database.is_ok() && ledger.is_ok();

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database.is_ok() { STATUS_OK } else { STATUS_ERROR }.to_string(),
        ledger: if ledger.is_ok() { STATUS_OK } else { STATUS_ERROR }.to_string(),
    };

    let body = Json(&health).into_response();

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_default();

    if is_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
