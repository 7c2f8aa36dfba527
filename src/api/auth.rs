use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use time::Duration;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::AppJson;
use crate::api::guards::CurrentUser;
use crate::api::response::{data, Data};
use crate::core::redis::rate_limit_key;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, RefreshRequest, TokenResponse};
use crate::schemas::user::{normalize_email, UserResponse};

/// Max login attempts per email per window.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Data<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let allowed = state
        .redis()
        .rate_limit(&rate_limit_key("login", &email), AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Inactive user"));
    }

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start login"))?;
    let response = issue_tokens(&state, &mut tx, user).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit login"))?;

    tracing::info!(user_id = %response.user.id, action = "login", "User logged in");
    Ok(data(response))
}

async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Data<TokenResponse>, ApiError> {
    let token_hash = security::hash_refresh_token(&payload.refresh_token);
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start refresh"))?;

    let stored = repositories::refresh_tokens::find_active_for_update(&mut *tx, &token_hash, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load refresh token"))?
        .ok_or(ApiError::Unauthorized("Invalid refresh token"))?;

    repositories::refresh_tokens::revoke(&mut *tx, &token_hash, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to revoke refresh token"))?;

    let user = repositories::users::find_by_id(state.db(), &stored.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .filter(|user| user.is_active)
        .ok_or(ApiError::Unauthorized("Invalid refresh token"))?;

    let response = issue_tokens(&state, &mut tx, user).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit refresh"))?;

    tracing::info!(user_id = %response.user.id, action = "token_refresh", "Rotated refresh token");
    Ok(data(response))
}

async fn logout(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    let token_hash = security::hash_refresh_token(&payload.refresh_token);
    let revoked = repositories::refresh_tokens::revoke(state.db(), &token_hash, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to revoke refresh token"))?;

    tracing::debug!(revoked, action = "logout", "Processed logout");
    Ok(StatusCode::NO_CONTENT)
}

async fn me(CurrentUser(user): CurrentUser) -> Data<UserResponse> {
    data(UserResponse::from_db(user))
}

async fn issue_tokens(
    state: &AppState,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user: User,
) -> Result<TokenResponse, ApiError> {
    let settings = state.settings();
    let access_token = security::create_access_token(&user.id, settings, None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let refresh_token = security::generate_refresh_token();
    let now = primitive_now_utc();
    let ttl_days = settings.security().refresh_token_expire_days.min(36_500) as i64;
    repositories::refresh_tokens::create(
        &mut **tx,
        repositories::refresh_tokens::CreateRefreshToken {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            token_hash: &security::hash_refresh_token(&refresh_token),
            expires_at: now.saturating_add(Duration::days(ttl_days)),
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store refresh token"))?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        expires_in: security::access_token_ttl(settings).whole_seconds(),
        user: UserResponse::from_db(user),
    })
}

#[cfg(test)]
mod tests;
