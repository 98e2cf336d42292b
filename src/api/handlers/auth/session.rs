//! Token lifecycle endpoints: refresh, invalidate, signout and the bearer-protected `me`.

use super::{
    error::ApiError,
    state::AuthState,
    types::{AckResponse, ErrorBody, Principal, PrincipalResponse, TokenBody, TokensResponse},
    utils::extract_bearer_token,
};
use crate::auth::TokenKind;
use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

fn token_from(payload: Option<Json<TokenBody>>) -> Result<String, ApiError> {
    let Some(Json(body)) = payload else {
        return Err(ApiError::BadRequest("Missing payload".to_string()));
    };
    body.validate()
        .map(str::to_string)
        .map_err(ApiError::BadRequest)
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = TokenBody,
    responses(
        (status = 200, description = "New token pair; the submitted refresh token is consumed", body = TokensResponse),
        (status = 400, description = "Missing token", body = ErrorBody),
        (status = 401, description = "Token invalid, expired, reused or not a refresh token", body = ErrorBody),
        (status = 503, description = "Session store unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TokenBody>>,
) -> Result<Json<TokensResponse>, ApiError> {
    let token = token_from(payload)?;
    let tokens = auth_state.authenticator().refresh(&token).await?;
    Ok(Json(TokensResponse {
        content: tokens,
        timestamp: Utc::now(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/invalidate",
    request_body = TokenBody,
    responses(
        (status = 200, description = "Token marked invalid", body = AckResponse),
        (status = 400, description = "Missing token", body = ErrorBody),
        (status = 401, description = "Token was not issued by this service", body = ErrorBody),
        (status = 503, description = "Session store unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn invalidate(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TokenBody>>,
) -> Result<Json<AckResponse>, ApiError> {
    let token = token_from(payload)?;
    auth_state.issuer().invalidate_token(&token).await?;
    Ok(Json(AckResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/auth/signout",
    request_body = TokenBody,
    params(
        ("Authorization" = Option<String>, Header, description = "Bearer access token to revoke as well")
    ),
    responses(
        (status = 200, description = "Tokens revoked", body = AckResponse),
        (status = 400, description = "Missing refresh token", body = ErrorBody),
        (status = 401, description = "Token was not issued by this service", body = ErrorBody),
        (status = 503, description = "Session store unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn signout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TokenBody>>,
) -> Result<Json<AckResponse>, ApiError> {
    let refresh_token = token_from(payload)?;
    let access_token = extract_bearer_token(&headers);
    auth_state
        .authenticator()
        .signout(&refresh_token, access_token.as_deref())
        .await?;
    Ok(Json(AckResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    ),
    responses(
        (status = 200, description = "Token is valid", body = PrincipalResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token", body = ErrorBody),
        (status = 503, description = "Session store unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<PrincipalResponse>, ApiError> {
    let token = extract_bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    let claims = auth_state
        .issuer()
        .validate_kind(&token, TokenKind::Access)
        .await?;
    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
    Ok(Json(PrincipalResponse {
        content: Principal {
            user_id: claims.sub,
            token_id: claims.jti,
            kind: claims.typ,
            expires_at,
        },
        timestamp: Utc::now(),
    }))
}
