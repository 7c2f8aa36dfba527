use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{AppJson, AppPath};
use crate::api::guards::CurrentUser;
use crate::api::response::{data, Data};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Pattern, User};
use crate::repositories;
use crate::schemas::pattern::{PatternCreate, PatternResponse, PatternUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_patterns).post(create_pattern))
        .route("/:pattern_id", get(get_pattern).put(update_pattern).delete(delete_pattern))
}

async fn list_patterns(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<Vec<PatternResponse>>, ApiError> {
    let rows = repositories::patterns::list_visible_with_stats(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list patterns"))?;

    Ok(data(rows.into_iter().map(PatternResponse::from_row).collect()))
}

async fn create_pattern(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PatternCreate>,
) -> Result<(StatusCode, Data<PatternResponse>), ApiError> {
    validate_payload(&payload)?;

    if payload.global && !user.is_admin() {
        return Err(ApiError::Forbidden("Only admins can create global patterns"));
    }

    let pattern = repositories::patterns::create(
        state.db(),
        repositories::patterns::CreatePattern {
            id: &Uuid::new_v4().to_string(),
            user_id: (!payload.global).then_some(user.id.as_str()),
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(map_write_error)?;

    tracing::info!(
        user_id = %user.id,
        pattern_id = %pattern.id,
        global = payload.global,
        action = "pattern_create",
        "Created pattern"
    );

    let response = load_pattern(&state, &user.id, &pattern.id).await?;
    Ok((StatusCode::CREATED, data(response)))
}

async fn get_pattern(
    AppPath(pattern_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<PatternResponse>, ApiError> {
    Ok(data(load_pattern(&state, &user.id, &pattern_id).await?))
}

async fn update_pattern(
    AppPath(pattern_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PatternUpdate>,
) -> Result<Data<PatternResponse>, ApiError> {
    validate_payload(&payload)?;
    let pattern = find_editable(&state, &user, &pattern_id).await?;

    repositories::patterns::update(
        state.db(),
        &pattern.id,
        repositories::patterns::UpdatePattern {
            title: payload.title.as_deref().map(str::trim),
            description: payload.description.as_deref(),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(map_write_error)?
    .ok_or_else(|| ApiError::NotFound("Pattern not found".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        pattern_id = %pattern.id,
        action = "pattern_update",
        "Updated pattern"
    );

    Ok(data(load_pattern(&state, &user.id, &pattern.id).await?))
}

async fn delete_pattern(
    AppPath(pattern_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let pattern = find_editable(&state, &user, &pattern_id).await?;

    repositories::patterns::delete(state.db(), &pattern.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete pattern"))?;

    tracing::info!(
        user_id = %user.id,
        pattern_id = %pattern.id,
        action = "pattern_delete",
        "Deleted pattern"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Own patterns are editable by their owner; global ones by admins only.
async fn find_editable(state: &AppState, user: &User, pattern_id: &str) -> Result<Pattern, ApiError> {
    let pattern = repositories::patterns::find_visible(state.db(), &user.id, pattern_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch pattern"))?
        .ok_or_else(|| ApiError::NotFound("Pattern not found".to_string()))?;

    match pattern.user_id.as_deref() {
        Some(owner) if owner == user.id => Ok(pattern),
        None if user.is_admin() => Ok(pattern),
        _ => Err(ApiError::Forbidden("Global patterns can only be changed by admins")),
    }
}

async fn load_pattern(
    state: &AppState,
    user_id: &str,
    pattern_id: &str,
) -> Result<PatternResponse, ApiError> {
    repositories::patterns::find_visible_with_stats(state.db(), user_id, pattern_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch pattern"))?
        .map(PatternResponse::from_row)
        .ok_or_else(|| ApiError::NotFound("Pattern not found".to_string()))
}

fn map_write_error(err: sqlx::Error) -> ApiError {
    if repositories::users::is_unique_violation(&err) {
        ApiError::Conflict("A pattern with this title already exists".to_string())
    } else {
        ApiError::internal(err, "Failed to save pattern")
    }
}
