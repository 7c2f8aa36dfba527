use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::api::guards::CurrentUser;
use crate::api::pagination::{PageParams, PaginatedResponse};
use crate::api::response::{data, Data};
use crate::api::validation::{validate_payload, validate_unique_ids};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::DifficultyLevel;
use crate::repositories;
use crate::repositories::problems::{ProblemFilter, ProblemStatsRow, SolveStatus};
use crate::schemas::attempt::AttemptResponse;
use crate::schemas::problem::{
    PatternRef, ProblemDetailResponse, ProblemResponse, ProblemWrite, ReviewScheduleResponse,
    UrgentProblemResponse,
};
use crate::services::candidates;
use crate::services::scoring::ReviewSchedule;
use crate::services::session_generator;

const MAX_URGENT_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct ProblemListQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    difficulty: Option<DifficultyLevel>,
    #[serde(default)]
    status: Option<SolveStatus>,
}

#[derive(Debug, Deserialize)]
struct UrgentQuery {
    #[serde(default)]
    limit: Option<u32>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_problems).post(create_problem))
        .route("/urgent", get(urgent_problems))
        .route("/:problem_id", get(get_problem).put(update_problem).delete(delete_problem))
        .route("/:problem_id/attempts", get(list_problem_attempts))
}

async fn list_problems(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProblemListQuery>,
) -> Result<Data<PaginatedResponse<ProblemResponse>>, ApiError> {
    let params = PageParams::new(query.page, query.page_size);
    let filter =
        ProblemFilter { query: query.q, difficulty: query.difficulty, status: query.status };

    let rows = repositories::problems::list_with_stats(
        state.db(),
        &user.id,
        &filter,
        params.offset(),
        params.page_size,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list problems"))?;
    let total = repositories::problems::count(state.db(), &user.id, &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count problems"))?;

    let items = with_patterns(&state, rows).await?;
    Ok(data(PaginatedResponse::new(items, total, params)))
}

async fn create_problem(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProblemWrite>,
) -> Result<(StatusCode, Data<ProblemResponse>), ApiError> {
    validate_payload(&payload)?;

    let problem_id = Uuid::new_v4().to_string();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start create"))?;

    let problem = repositories::problems::create(
        &mut *tx,
        repositories::problems::CreateProblem {
            id: &problem_id,
            user_id: &user.id,
            title: payload.title.trim(),
            source: payload.source.as_deref(),
            url: payload.url.as_deref(),
            difficulty: payload.difficulty,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create problem"))?;

    if let Some(pattern_ids) = payload.pattern_ids.as_deref() {
        link_patterns(&mut tx, &user.id, &problem.id, pattern_ids).await?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit problem"))?;

    tracing::info!(
        user_id = %user.id,
        problem_id = %problem.id,
        action = "problem_create",
        "Created problem"
    );

    let response = load_problem(&state, &user.id, &problem.id).await?;
    Ok((StatusCode::CREATED, data(response)))
}

async fn get_problem(
    AppPath(problem_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<ProblemDetailResponse>, ApiError> {
    let row = repositories::problems::find_with_stats(state.db(), &user.id, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    let history = repositories::attempts::history_for_problem(state.db(), &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt history"))?;
    let schedule = ReviewSchedule::replay(
        history.into_iter().map(|attempt| (attempt.outcome, attempt.confidence_score)),
    )
    .map(|schedule| ReviewScheduleResponse::from_schedule(schedule, row.last_attempt_at));

    let problem = with_patterns(&state, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    Ok(data(ProblemDetailResponse { problem, schedule }))
}

async fn update_problem(
    AppPath(problem_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProblemWrite>,
) -> Result<Data<ProblemResponse>, ApiError> {
    validate_payload(&payload)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start update"))?;

    repositories::problems::update(
        &mut *tx,
        &user.id,
        &problem_id,
        repositories::problems::UpdateProblem {
            title: payload.title.trim(),
            source: payload.source.as_deref(),
            url: payload.url.as_deref(),
            difficulty: payload.difficulty,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update problem"))?
    .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    if let Some(pattern_ids) = payload.pattern_ids.as_deref() {
        link_patterns(&mut tx, &user.id, &problem_id, pattern_ids).await?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit problem"))?;

    tracing::info!(
        user_id = %user.id,
        problem_id = %problem_id,
        action = "problem_update",
        "Updated problem"
    );

    Ok(data(load_problem(&state, &user.id, &problem_id).await?))
}

async fn delete_problem(
    AppPath(problem_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start delete"))?;

    repositories::problems::lock_owned(&mut *tx, &user.id, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    let attempts = repositories::problems::count_attempts(&mut *tx, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;
    if attempts > 0 {
        return Err(ApiError::Conflict(format!(
            "Problem has {attempts} recorded attempts and cannot be deleted"
        )));
    }

    let session_ids = repositories::sessions::list_ids_containing(&mut *tx, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session memberships"))?;

    repositories::problems::delete(&mut *tx, &user.id, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete problem"))?;

    for session_id in &session_ids {
        repositories::sessions::recompact(&mut *tx, session_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to recompact session order"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit delete"))?;

    tracing::info!(
        user_id = %user.id,
        problem_id = %problem_id,
        sessions = session_ids.len(),
        action = "problem_delete",
        "Deleted problem"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn urgent_problems(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UrgentQuery>,
) -> Result<Data<Vec<UrgentProblemResponse>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.settings().practice().urgent_problems_limit)
        .clamp(1, MAX_URGENT_LIMIT) as usize;

    let weights = repositories::settings::load_weights(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load scoring weights"))?;
    let candidates = candidates::load(state.db(), &user.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load problems"))?;

    let ranked = session_generator::rank(candidates, &weights);
    Ok(data(ranked.into_iter().take(limit).map(UrgentProblemResponse::from_ranked).collect()))
}

async fn list_problem_attempts(
    AppPath(problem_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<Vec<AttemptResponse>>, ApiError> {
    repositories::problems::find_owned(state.db(), &user.id, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    let attempts =
        repositories::attempts::list_completed_for_problem(state.db(), &user.id, &problem_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(data(attempts.into_iter().map(AttemptResponse::from_db).collect()))
}

async fn link_patterns(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &str,
    problem_id: &str,
    pattern_ids: &[String],
) -> Result<(), ApiError> {
    validate_unique_ids(pattern_ids, "pattern_ids")?;

    if !pattern_ids.is_empty() {
        let visible = repositories::patterns::count_visible(&mut **tx, user_id, pattern_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check patterns"))?;
        if visible != pattern_ids.len() as i64 {
            return Err(ApiError::BadRequest("Unknown pattern id in pattern_ids".to_string()));
        }
    }

    repositories::problems::replace_patterns(tx, problem_id, pattern_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to link patterns"))
}

async fn load_problem(
    state: &AppState,
    user_id: &str,
    problem_id: &str,
) -> Result<ProblemResponse, ApiError> {
    let row = repositories::problems::find_with_stats(state.db(), user_id, problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    with_patterns(state, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))
}

async fn with_patterns(
    state: &AppState,
    rows: Vec<ProblemStatsRow>,
) -> Result<Vec<ProblemResponse>, ApiError> {
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let linked = repositories::patterns::list_for_problems(state.db(), &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load problem patterns"))?;

    let mut by_problem: HashMap<String, Vec<PatternRef>> = HashMap::new();
    for row in linked {
        by_problem.entry(row.problem_id).or_default().push(PatternRef { id: row.id, title: row.title });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let patterns = by_problem.remove(&row.id).unwrap_or_default();
            ProblemResponse::from_row(row, patterns)
        })
        .collect())
}

#[cfg(test)]
mod tests;
