use super::{
    error::ApiError,
    state::AuthState,
    types::{AccountResponse, ErrorBody, SignupBody},
};
use axum::{Json, extract::Extension, http::StatusCode};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupBody,
    responses(
        (status = 201, description = "Account created, pending verification", body = AccountResponse),
        (status = 400, description = "Missing or malformed fields", body = ErrorBody),
        (status = 406, description = "Account records could not be written", body = ErrorBody),
        (status = 409, description = "Username or email already registered", body = ErrorBody),
        (status = 500, description = "Transaction failure", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn signup(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupBody>>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let Some(Json(body)) = payload else {
        return Err(ApiError::BadRequest("Missing payload".to_string()));
    };
    let request = body.validate().map_err(ApiError::BadRequest)?;

    let account = auth_state.registrar().signup(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            content: account,
            timestamp: Utc::now(),
        }),
    ))
}
