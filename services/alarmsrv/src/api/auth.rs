//! Bearer-token auth gate
//!
//! Authentication proper is an external collaborator; what the service
//! needs is an opaque current-user id in front of every protected route.
//! Tokens are opaque UUIDs mapped to user ids in Redis with a TTL, issued
//! at login and revoked at logout.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use tracing::warn;
use uuid::Uuid;

use crate::api::models::{LoginRequest, LoginResponse, MessageResponse};
use crate::cache::keys;
use crate::error::ApiError;
use crate::store::PublicUser;
use crate::AppState;

/// Authenticated request context, inserted by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: i64,
    pub token: String,
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find_by_email(&request.email)
        .await
        .map_err(ApiError::from)?
        .filter(|user| user.password == request.password)
        .ok_or_else(|| ApiError::unauthorized("Credenciais inválidas"))?;

    let token = Uuid::new_v4().to_string();
    state
        .cache
        .put(
            &keys::auth_token(&token),
            &user.id.to_string(),
            state.config.auth.token_ttl_secs,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to store auth token: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = state.cache.forget(&keys::auth_token(&session.token)).await {
        warn!("Failed to revoke token for user {}: {}", session.user_id, e);
    }
    Ok(Json(MessageResponse {
        message: "Logout efetuado".to_string(),
    }))
}

/// GET /user
pub async fn current_user(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .users
        .find(session.user_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::unauthorized("Token inválido"))?;
    Ok(Json(user.into()))
}

/// Middleware gating every protected route; unauthenticated calls get 401
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Token ausente"))?
        .to_string();

    // A token lookup failure is a 401, not fail-open: the gate must not
    // degrade the way the read cache does.
    let user_id = state
        .cache
        .get(&keys::auth_token(&token))
        .await
        .map_err(|e| {
            warn!("Token lookup failed: {}", e);
            ApiError::unauthorized("Token inválido")
        })?
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| ApiError::unauthorized("Token inválido"))?;

    request
        .extensions_mut()
        .insert(AuthSession { user_id, token });

    Ok(next.run(request).await)
}
