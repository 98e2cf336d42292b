use crate::{
    api::handlers::root,
    auth::{PgStore, RedisLedger, TokenConfig},
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use sqlx::postgres::PgPoolOptions;
use std::{future::IntoFuture, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::oneshot};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span, warn};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod handlers;
mod openapi;

pub use handlers::auth::{AuthState, DEFAULT_REQUEST_TIMEOUT};
pub use openapi::openapi;

const REQUEST_ID: &str = "x-request-id";

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Postgres pool sizing.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            min_connections: 5,
            max_lifetime: Duration::from_secs(600),
            idle_timeout: Duration::from_secs(180),
        }
    }
}

#[derive(Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub dsn: String,
    pub pool: PoolConfig,
    pub redis_url: String,
    pub tokens: TokenConfig,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub cors_allow_origin: String,
}

/// Build the service: documented routes, `/`, swagger UI and middleware.
#[must_use]
pub fn app(auth_state: Arc<AuthState>, cors: CorsLayer) -> Router {
    let (router, openapi) = router().split_for_parts();
    router
        .route("/", get(root::root))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", openapi))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if the database or ledger is unreachable, or the listener fails
pub async fn new(config: ServerConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(config.pool.min_connections)
        .max_connections(config.pool.max_connections)
        .max_lifetime(config.pool.max_lifetime)
        .idle_timeout(config.pool.idle_timeout)
        .acquire_timeout(config.request_timeout)
        .test_before_acquire(true)
        .connect(&config.dsn)
        .await
        .context("Failed to connect to database")?;

    let ledger = RedisLedger::connect(&config.redis_url)
        .await
        .context("Failed to connect to revocation ledger")?;

    let auth_state = Arc::new(AuthState::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(ledger),
        &config.tokens,
        config.request_timeout,
    ));

    let cors = cors_layer(&config.cors_allow_origin)?;
    let app = app(auth_state, cors);

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!("Listening on [::]:{}", config.port);

    let shutdown_timeout = config.shutdown_timeout;
    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Gracefully shutdown");
            let _ = signalled_tx.send(());
        })
        .into_future();

    let drain_deadline = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => result?,
        () = drain_deadline => warn!("In-flight requests did not finish within {:?}", shutdown_timeout),
    }

    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// CORS for the configured origin list. `*` allows any origin.
///
/// # Errors
/// Returns an error if an origin is not a valid header value.
pub fn cors_layer(allow_origin: &str) -> Result<CorsLayer> {
    let origin = if allow_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins = allow_origin
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid CORS origin: {origin}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(origin))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
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
