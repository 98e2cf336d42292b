use super::{
    error::ApiError,
    state::AuthState,
    types::{ErrorBody, SessionResponse, SigninBody},
};
use axum::{Json, extract::Extension};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninBody,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Missing or malformed fields", body = ErrorBody),
        (status = 401, description = "Invalid username or password", body = ErrorBody),
        (status = 403, description = "Account blocked or not verified", body = ErrorBody),
        (status = 503, description = "Session store unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn signin(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninBody>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Some(Json(body)) = payload else {
        return Err(ApiError::BadRequest("Missing payload".to_string()));
    };
    body.validate().map_err(ApiError::BadRequest)?;

    let session = auth_state
        .authenticator()
        .signin(body.username.trim(), &body.password)
        .await?;

    Ok(Json(SessionResponse {
        content: session,
        timestamp: Utc::now(),
    }))
}
