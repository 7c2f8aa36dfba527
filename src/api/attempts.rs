use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use time::Duration;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::api::guards::CurrentUser;
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::api::response::{data, Data};
use crate::api::validation::validate_payload;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{parse_rfc3339_utc, primitive_now_utc};
use crate::db::models::Attempt;
use crate::db::types::{AttemptStatus, TimerState};
use crate::repositories;
use crate::schemas::attempt::{
    AttemptComplete, AttemptCreate, AttemptResponse, AttemptStart, InProgressQuery, TimerUpdate,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attempts).post(create_attempt))
        .route("/start", post(start_attempt))
        .route("/in-progress", get(in_progress_attempt))
        .route("/:attempt_id", get(get_attempt).delete(abandon_attempt))
        .route("/:attempt_id/timer", put(update_timer))
        .route("/:attempt_id/complete", put(complete_attempt))
}

async fn create_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AttemptCreate>,
) -> Result<(StatusCode, Data<AttemptResponse>), ApiError> {
    validate_payload(&payload)?;

    let performed_at = match payload.performed_at.as_deref() {
        Some(value) => parse_rfc3339_utc(value).ok_or_else(|| {
            ApiError::BadRequest("performed_at must be an RFC 3339 timestamp".to_string())
        })?,
        None => primitive_now_utc(),
    };
    if performed_at > primitive_now_utc() + Duration::minutes(5) {
        return Err(ApiError::UnprocessableEntity(
            "performed_at cannot be in the future".to_string(),
        ));
    }

    ensure_problem_owned(&state, &user.id, &payload.problem_id).await?;
    ensure_session_contains(&state, &user.id, payload.session_id.as_deref(), &payload.problem_id)
        .await?;

    let attempt = repositories::attempts::create_completed(
        state.db(),
        repositories::attempts::CreateCompletedAttempt {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            problem_id: &payload.problem_id,
            session_id: payload.session_id.as_deref(),
            outcome: payload.outcome,
            confidence_score: payload.confidence_score,
            duration_seconds: payload.duration_seconds,
            notes: payload.notes.as_deref(),
            performed_at,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record attempt"))?;

    metrics::record_attempt_completed(payload.outcome);
    tracing::info!(
        user_id = %user.id,
        problem_id = %attempt.problem_id,
        attempt_id = %attempt.id,
        outcome = payload.outcome.as_str(),
        action = "attempt_record",
        "Recorded attempt"
    );

    Ok((StatusCode::CREATED, data(AttemptResponse::from_db(attempt))))
}

async fn list_attempts(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Data<PaginatedResponse<AttemptResponse>>, ApiError> {
    let params = query.params();

    let attempts = repositories::attempts::list_completed(
        state.db(),
        &user.id,
        params.offset(),
        params.page_size,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;
    let total = repositories::attempts::count_completed(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    let items = attempts.into_iter().map(AttemptResponse::from_db).collect();
    Ok(data(PaginatedResponse::new(items, total, params)))
}

async fn start_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AttemptStart>,
) -> Result<(StatusCode, Data<AttemptResponse>), ApiError> {
    ensure_problem_owned(&state, &user.id, &payload.problem_id).await?;
    ensure_session_contains(&state, &user.id, payload.session_id.as_deref(), &payload.problem_id)
        .await?;

    let started = repositories::attempts::start(
        state.db(),
        repositories::attempts::StartAttempt {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            problem_id: &payload.problem_id,
            session_id: payload.session_id.as_deref(),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to start attempt"))?;

    if let Some(attempt) = started {
        tracing::info!(
            user_id = %user.id,
            problem_id = %attempt.problem_id,
            attempt_id = %attempt.id,
            action = "attempt_start",
            "Started attempt"
        );
        return Ok((StatusCode::CREATED, data(AttemptResponse::from_db(attempt))));
    }

    let existing =
        repositories::attempts::find_in_progress(state.db(), &user.id, &payload.problem_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
            .ok_or_else(|| ApiError::Conflict("Attempt state changed, retry".to_string()))?;

    Ok((StatusCode::OK, data(AttemptResponse::from_db(existing))))
}

async fn in_progress_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InProgressQuery>,
) -> Result<Data<AttemptResponse>, ApiError> {
    let attempt = repositories::attempts::find_in_progress(state.db(), &user.id, &query.problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound("No attempt in progress".to_string()))?;

    Ok(data(AttemptResponse::from_db(attempt)))
}

async fn get_attempt(
    AppPath(attempt_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<AttemptResponse>, ApiError> {
    let attempt = find_attempt(&state, &user.id, &attempt_id).await?;
    Ok(data(AttemptResponse::from_db(attempt)))
}

async fn update_timer(
    AppPath(attempt_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<TimerUpdate>,
) -> Result<Data<AttemptResponse>, ApiError> {
    validate_payload(&payload)?;
    if payload.timer_state == TimerState::Stopped {
        return Err(ApiError::BadRequest(
            "Attempts are stopped by completing them".to_string(),
        ));
    }

    let attempt = find_attempt(&state, &user.id, &attempt_id).await?;
    ensure_in_progress(&attempt)?;

    let attempt = repositories::attempts::update_timer(
        state.db(),
        &attempt.id,
        payload.elapsed_time_seconds,
        payload.timer_state,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update timer"))?
    .ok_or_else(|| ApiError::Conflict("Attempt is already completed".to_string()))?;

    tracing::debug!(
        attempt_id = %attempt.id,
        elapsed = attempt.elapsed_time_seconds,
        "Attempt heartbeat"
    );

    Ok(data(AttemptResponse::from_db(attempt)))
}

async fn complete_attempt(
    AppPath(attempt_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AttemptComplete>,
) -> Result<Data<AttemptResponse>, ApiError> {
    validate_payload(&payload)?;

    let attempt = find_attempt(&state, &user.id, &attempt_id).await?;
    ensure_in_progress(&attempt)?;

    let attempt = repositories::attempts::complete(
        state.db(),
        &attempt.id,
        repositories::attempts::CompleteAttempt {
            outcome: payload.outcome,
            confidence_score: payload.confidence_score,
            duration_seconds: payload.duration_seconds,
            notes: payload.notes.as_deref(),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to complete attempt"))?
    .ok_or_else(|| ApiError::Conflict("Attempt is already completed".to_string()))?;

    metrics::record_attempt_completed(payload.outcome);
    tracing::info!(
        user_id = %user.id,
        problem_id = %attempt.problem_id,
        attempt_id = %attempt.id,
        outcome = payload.outcome.as_str(),
        duration_seconds = attempt.duration_seconds,
        action = "attempt_complete",
        "Completed attempt"
    );

    Ok(data(AttemptResponse::from_db(attempt)))
}

async fn abandon_attempt(
    AppPath(attempt_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let attempt = find_attempt(&state, &user.id, &attempt_id).await?;
    ensure_in_progress(&attempt)?;

    let deleted = repositories::attempts::delete_in_progress(state.db(), &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to abandon attempt"))?;
    if !deleted {
        return Err(ApiError::Conflict("Attempt is already completed".to_string()));
    }

    tracing::info!(
        user_id = %user.id,
        attempt_id = %attempt.id,
        action = "attempt_abandon",
        "Abandoned attempt"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn find_attempt(state: &AppState, user_id: &str, attempt_id: &str) -> Result<Attempt, ApiError> {
    repositories::attempts::find_owned(state.db(), user_id, attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))
}

fn ensure_in_progress(attempt: &Attempt) -> Result<(), ApiError> {
    if attempt.status == AttemptStatus::Completed {
        return Err(ApiError::Conflict("Attempt is already completed".to_string()));
    }
    Ok(())
}

async fn ensure_problem_owned(state: &AppState, user_id: &str, problem_id: &str) -> Result<(), ApiError> {
    repositories::problems::find_owned(state.db(), user_id, problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;
    Ok(())
}

async fn ensure_session_contains(
    state: &AppState,
    user_id: &str,
    session_id: Option<&str>,
    problem_id: &str,
) -> Result<(), ApiError> {
    let Some(session_id) = session_id else {
        return Ok(());
    };

    repositories::sessions::find_owned(state.db(), user_id, session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    let contains = repositories::sessions::contains_problem(state.db(), session_id, problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check session membership"))?;
    if !contains {
        return Err(ApiError::BadRequest("Problem is not part of this session".to_string()));
    }
    Ok(())
}
