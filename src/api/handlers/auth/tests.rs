//! Router-level tests for the auth endpoints over in-memory backends.

use super::AuthState;
use super::error::{MSG_ACCOUNT_NOT_ALLOWED, MSG_BAD_CREDENTIALS};
use crate::api::{app, cors_layer};
use crate::auth::{MemoryLedger, MemoryStore, RevocationLedger, TokenConfig, TokenStatus};
use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "router-test-secret-router-test-secret";

struct Harness {
    store: MemoryStore,
    ledger: Arc<MemoryLedger>,
    app: Router,
}

impl Harness {
    fn new() -> Result<Self> {
        let store = MemoryStore::new();
        let ledger = Arc::new(MemoryLedger::new());
        let state = AuthState::new(
            Arc::new(store.clone()),
            ledger.clone(),
            &TokenConfig::new(SecretString::from(SECRET.to_string())),
            Duration::from_secs(2),
        );
        let app = app(Arc::new(state), cors_layer("*")?);
        Ok(Self { store, ledger, app })
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok((status, value))
    }

    async fn post(&self, uri: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?;
        self.send(request).await
    }

    async fn signup_and_check(&self, username: &str) -> Result<()> {
        let (status, _) = self
            .post(
                "/auth/signup",
                &json!({
                    "email": format!("{username}@x.com"),
                    "username": username,
                    "password": "p4ssw0rd",
                    "firstname": "First",
                    "lastname": "Last"
                }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert!(self.store.set_checked(username, true));
        Ok(())
    }

    async fn signin(&self, username: &str) -> Result<(String, String)> {
        let (status, body) = self
            .post(
                "/auth/signin",
                &json!({"username": username, "password": "p4ssw0rd"}),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        let access = body["content"]["tokens"]["access"]
            .as_str()
            .context("missing access token")?;
        let refresh = body["content"]["tokens"]["refresh"]
            .as_str()
            .context("missing refresh token")?;
        Ok((access.to_string(), refresh.to_string()))
    }
}

fn message(body: &Value) -> &str {
    body["message"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn email_username_signs_in_as_typed() -> Result<()> {
    let harness = Harness::new()?;

    let (status, body) = harness
        .post(
            "/auth/signup",
            &json!({
                "email": " Alice@X.com ",
                "password": "p4ssw0rd",
                "firstname": "Alice",
                "lastname": "Liddell"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"]["username"], "Alice@X.com");
    assert!(harness.store.set_checked("Alice@X.com", true));

    let (status, body) = harness
        .post(
            "/auth/signin",
            &json!({"username": "Alice@X.com", "password": "p4ssw0rd"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["user"]["username"], "Alice@X.com");

    // the contact is stored normalized, so another casing is still a duplicate
    let (status, _) = harness
        .post(
            "/auth/signup",
            &json!({
                "email": "alice@x.com",
                "username": "alice2",
                "password": "p4ssw0rd",
                "firstname": "Alice",
                "lastname": "Liddell"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn signup_then_signin_requires_verification() -> Result<()> {
    let harness = Harness::new()?;

    let (status, body) = harness
        .post(
            "/auth/signup",
            &json!({
                "email": "a@x.com",
                "username": "alice",
                "password": "p4ssw0rd",
                "firstname": "Alice",
                "lastname": "Liddell"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"]["username"], "alice");
    assert_eq!(body["content"]["is_checked"], false);
    assert!(body["content"].get("password").is_none());
    assert!(body["timestamp"].is_string());

    let (status, body) = harness
        .post(
            "/auth/signin",
            &json!({"username": "alice", "password": "p4ssw0rd"}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), MSG_ACCOUNT_NOT_ALLOWED);
    assert_eq!(body["code"], 403);

    harness.store.set_checked("alice", true);
    let (access, refresh) = harness.signin("alice").await?;
    assert!(!access.is_empty());
    assert_eq!(
        harness.ledger.get(&refresh).await?,
        Some(TokenStatus::Valid)
    );
    Ok(())
}

#[tokio::test]
async fn signup_duplicate_is_conflict() -> Result<()> {
    let harness = Harness::new()?;
    let body = json!({
        "email": "a@x.com",
        "password": "p4ssw0rd",
        "firstname": "Alice",
        "lastname": "Liddell"
    });
    let (status, _) = harness.post("/auth/signup", &body).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(harness.store.account("a@x.com").is_some());

    let (status, body) = harness.post("/auth/signup", &body).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
    assert_eq!(harness.store.account_count(), 1);
    Ok(())
}

#[tokio::test]
async fn signup_rejects_bad_input() -> Result<()> {
    let harness = Harness::new()?;
    let (status, body) = harness
        .post(
            "/auth/signup",
            &json!({
                "email": "nope",
                "password": "p4ssw0rd",
                "firstname": "A",
                "lastname": "B"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "Invalid email");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;
    let (status, _) = harness.send(request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_user_and_wrong_password_look_the_same() -> Result<()> {
    let harness = Harness::new()?;
    harness.signup_and_check("alice").await?;

    let (unknown_status, unknown) = harness
        .post(
            "/auth/signin",
            &json!({"username": "bob", "password": "p4ssw0rd"}),
        )
        .await?;
    let (wrong_status, wrong) = harness
        .post(
            "/auth/signin",
            &json!({"username": "alice", "password": "wrong-password"}),
        )
        .await?;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(message(&unknown), MSG_BAD_CREDENTIALS);
    assert_eq!(message(&unknown), message(&wrong));
    Ok(())
}

#[tokio::test]
async fn blocked_account_is_forbidden() -> Result<()> {
    let harness = Harness::new()?;
    harness.signup_and_check("alice").await?;
    harness.store.set_blocked("alice", true);

    let (status, body) = harness
        .post(
            "/auth/signin",
            &json!({"username": "alice", "password": "p4ssw0rd"}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), MSG_ACCOUNT_NOT_ALLOWED);
    assert!(harness.ledger.is_empty());
    Ok(())
}

#[tokio::test]
async fn me_requires_valid_access_token() -> Result<()> {
    let harness = Harness::new()?;
    harness.signup_and_check("alice").await?;
    let (access, refresh) = harness.signin("alice").await?;

    let request = Request::builder().uri("/auth/me").body(Body::empty())?;
    let (status, _) = harness.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())?;
    let (status, body) = harness.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    let account = harness.store.account("alice").context("missing account")?;
    assert_eq!(body["content"]["user_id"], account.id.to_string());
    assert_eq!(body["content"]["kind"], "access");

    // a refresh token is not an access token
    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
        .body(Body::empty())?;
    let (status, _) = harness.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_and_rejects_reuse() -> Result<()> {
    let harness = Harness::new()?;
    harness.signup_and_check("alice").await?;
    let (_, refresh) = harness.signin("alice").await?;

    let (status, body) = harness
        .post("/auth/refresh", &json!({"token": refresh}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["content"]["refresh"]
        .as_str()
        .context("missing refresh token")?;
    assert_ne!(rotated, refresh);

    let (status, _) = harness
        .post("/auth/refresh", &json!({"token": refresh}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn signout_revokes_refresh_and_bearer_access() -> Result<()> {
    let harness = Harness::new()?;
    harness.signup_and_check("alice").await?;
    let (access, refresh) = harness.signin("alice").await?;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/signout")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::from(serde_json::to_vec(&json!({"token": refresh}))?))?;
    let (status, body) = harness.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "ok");

    assert_eq!(harness.ledger.get(&access).await?, Some(TokenStatus::Invalid));
    assert_eq!(harness.ledger.get(&refresh).await?, Some(TokenStatus::Invalid));

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())?;
    let (status, _) = harness.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn signout_with_access_token_in_body_keeps_session() -> Result<()> {
    let harness = Harness::new()?;
    harness.signup_and_check("alice").await?;
    let (access, refresh) = harness.signin("alice").await?;

    let (status, _) = harness
        .post("/auth/signout", &json!({"token": access}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(harness.ledger.get(&access).await?, None);
    assert_eq!(harness.ledger.get(&refresh).await?, Some(TokenStatus::Valid));

    let (status, _) = harness
        .post("/auth/refresh", &json!({"token": refresh}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn invalidate_rejects_foreign_tokens() -> Result<()> {
    let harness = Harness::new()?;
    let (status, _) = harness
        .post("/auth/invalidate", &json!({"token": "not.a.jwt"}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(harness.ledger.is_empty());

    let (status, body) = harness
        .post("/auth/invalidate", &json!({"token": "  "}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "Missing token");
    Ok(())
}

#[tokio::test]
async fn ledger_outage_is_service_unavailable() -> Result<()> {
    let harness = Harness::new()?;
    harness.signup_and_check("alice").await?;
    harness.ledger.set_available(false);

    let (status, body) = harness
        .post(
            "/auth/signin",
            &json!({"username": "alice", "password": "p4ssw0rd"}),
        )
        .await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 503);
    Ok(())
}

#[tokio::test]
async fn store_outage_is_service_unavailable() -> Result<()> {
    let harness = Harness::new()?;
    harness.store.set_available(false);
    let (status, body) = harness
        .post(
            "/auth/signup",
            &json!({
                "email": "a@x.com",
                "username": "alice",
                "password": "p4ssw0rd",
                "firstname": "Alice",
                "lastname": "Liddell"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 503);
    assert_eq!(harness.store.account_count(), 0);
    Ok(())
}

#[tokio::test]
async fn health_reports_dependencies() -> Result<()> {
    let harness = Harness::new()?;
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = harness.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
    assert_eq!(body["ledger"], "ok");

    harness.ledger.set_available(false);
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = harness.send(request).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ledger"], "error");

    harness.store.set_available(false);
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = harness.send(request).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "error");
    Ok(())
}

struct StalledLedger;

#[async_trait::async_trait]
impl RevocationLedger for StalledLedger {
    async fn set(&self, _: &str, _: TokenStatus, _: Duration) -> crate::auth::Result<()> {
        std::future::pending().await
    }

    async fn swap(
        &self,
        _: &str,
        _: TokenStatus,
        _: Duration,
    ) -> crate::auth::Result<Option<TokenStatus>> {
        std::future::pending().await
    }

    async fn get(&self, _: &str) -> crate::auth::Result<Option<TokenStatus>> {
        std::future::pending().await
    }

    async fn delete(&self, _: &str) -> crate::auth::Result<()> {
        std::future::pending().await
    }

    async fn ping(&self) -> crate::auth::Result<()> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn health_bounded_when_ledger_stalls() -> Result<()> {
    let state = AuthState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StalledLedger),
        &TokenConfig::new(SecretString::from(SECRET.to_string())),
        Duration::from_millis(50),
    );
    let app = app(Arc::new(state), cors_layer("*")?);
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let response = tokio::time::timeout(Duration::from_secs(2), app.oneshot(request))
        .await
        .context("health hung on a stalled ledger")??;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let bytes = response.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["database"], "ok");
    assert_eq!(body["ledger"], "error");
    Ok(())
}

#[tokio::test]
async fn health_preflight_answered_by_cors() -> Result<()> {
    let harness = Harness::new()?;
    harness.store.set_available(false);
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/health")
        .header(header::ORIGIN, "https://app.brickwall.dev")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())?;
    let response = harness.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
    Ok(())
}

#[tokio::test]
async fn request_id_is_propagated() -> Result<()> {
    let harness = Harness::new()?;
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "req-123")
        .body(Body::empty())?;
    let response = harness.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-123")
    );

    let request = Request::builder().uri("/").body(Body::empty())?;
    let response = harness.app.clone().oneshot(request).await?;
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}
