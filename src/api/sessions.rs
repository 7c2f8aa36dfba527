use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::api::guards::CurrentUser;
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::api::response::{data, Data};
use crate::api::validation::{validate_payload, validate_unique_ids};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::RevisionSession;
use crate::repositories;
use crate::schemas::session::{
    GenerateRequest, GeneratedSessionResponse, ReorderRequest, SessionCreate,
    SessionDetailResponse, SessionSummaryResponse, SessionTimerUpdate, SkipRequest,
    TemplateGroupResponse, TemplateResponse,
};
use crate::services::candidates;
use crate::services::session_generator::{self, GenerationRequest};
use crate::services::session_order::{self, OrderError};
use crate::services::templates::{self, SessionTemplate, TemplateCategory};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/templates", get(list_templates))
        .route("/generate", post(generate_session))
        .route("/:session_id", get(get_session).delete(delete_session))
        .route("/:session_id/reorder", put(reorder_session))
        .route("/:session_id/skip", post(skip_problem))
        .route("/:session_id/timer", put(update_timer))
        .route("/:session_id/complete", put(complete_session))
}

async fn list_templates(CurrentUser(_user): CurrentUser) -> Data<Vec<TemplateGroupResponse>> {
    let groups = TemplateCategory::ALL
        .into_iter()
        .map(|category| TemplateGroupResponse {
            category,
            templates: templates::by_category(category).map(TemplateResponse::from_template).collect(),
        })
        .collect();
    data(groups)
}

async fn generate_session(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<GenerateRequest>,
) -> Result<Data<GeneratedSessionResponse>, ApiError> {
    validate_payload(&payload)?;
    let template = find_template(&payload.template_key)?;

    let weights = repositories::settings::load_weights(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load scoring weights"))?;
    let candidates = candidates::load(state.db(), &user.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load problems"))?;
    let pool_size = candidates.len();

    let request = GenerationRequest {
        template,
        duration_min: payload.duration_min,
        pattern_id: payload.pattern_id.as_deref(),
    };

    let generated =
        match session_generator::generate(&request, candidates, &weights, state.settings().practice())
        {
            Ok(generated) => generated,
            Err(err) => {
                metrics::record_generation_rejected(template.key, err.label());
                tracing::info!(
                    user_id = %user.id,
                    template = template.key,
                    pool_size,
                    reason = err.label(),
                    "Session generation rejected"
                );
                return Err(ApiError::BadRequest(err.to_string()));
            }
        };

    metrics::record_session_generated(template.key, generated.problems.len());
    tracing::info!(
        user_id = %user.id,
        template = template.key,
        pool_size,
        selected = generated.problems.len(),
        total_planned_min = generated.total_planned_min,
        action = "session_generate",
        "Generated session preview"
    );

    Ok(data(GeneratedSessionResponse::from_generated(generated)))
}

async fn create_session(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SessionCreate>,
) -> Result<(StatusCode, Data<SessionDetailResponse>), ApiError> {
    validate_payload(&payload)?;
    let template = find_template(&payload.template_key)?;
    validate_unique_ids(&payload.problem_ids, "problem_ids")?;

    let owned =
        repositories::problems::list_owned_by_ids(state.db(), &user.id, &payload.problem_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load problems"))?;
    if owned.len() != payload.problem_ids.len() {
        return Err(ApiError::BadRequest("Unknown problem id in problem_ids".to_string()));
    }
    let difficulties: HashMap<&str, _> =
        owned.iter().map(|problem| (problem.id.as_str(), problem.difficulty)).collect();

    let weights = repositories::settings::load_weights(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load scoring weights"))?;
    let candidates = candidates::load(state.db(), &user.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load problems"))?
        .into_iter()
        .filter(|candidate| difficulties.contains_key(candidate.problem_id.as_str()))
        .collect();
    let scores: HashMap<String, (f64, String)> =
        session_generator::rank(candidates, &weights.with_emphasis(template.emphasis))
            .into_iter()
            .map(|ranked| (ranked.candidate.problem_id, (ranked.score, ranked.reason)))
            .collect();

    let practice = state.settings().practice();
    let mut items = Vec::with_capacity(payload.problem_ids.len());
    for problem_id in &payload.problem_ids {
        let difficulty = difficulties
            .get(problem_id.as_str())
            .copied()
            .ok_or_else(|| ApiError::BadRequest("Unknown problem id in problem_ids".to_string()))?;
        let (score, reason) =
            scores.get(problem_id).map(|(score, reason)| (*score, reason.as_str())).unwrap_or((0.0, ""));
        items.push(repositories::sessions::SessionItem {
            problem_id,
            planned_min: practice.planned_minutes(difficulty) as i32,
            score,
            reason,
        });
    }

    let now = primitive_now_utc();
    let session_name = payload
        .session_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_session_name(template, now.date()));

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start session"))?;

    let session = repositories::sessions::create(
        &mut *tx,
        repositories::sessions::CreateSession {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            template_key: template.key,
            session_name: &session_name,
            planned_duration_min: payload.planned_duration_min,
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create session"))?;

    repositories::sessions::insert_problems(&mut tx, &session.id, &items)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store session problems"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit session"))?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        template = template.key,
        problems = items.len(),
        action = "session_create",
        "Created session"
    );

    let detail = session_detail(&state, session).await?;
    Ok((StatusCode::CREATED, data(detail)))
}

async fn list_sessions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Data<PaginatedResponse<SessionSummaryResponse>>, ApiError> {
    let params = query.params();

    let rows =
        repositories::sessions::list_for_user(state.db(), &user.id, params.offset(), params.page_size)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list sessions"))?;
    let total = repositories::sessions::count_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count sessions"))?;

    let items = rows.into_iter().map(SessionSummaryResponse::from_row).collect();
    Ok(data(PaginatedResponse::new(items, total, params)))
}

async fn get_session(
    AppPath(session_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<SessionDetailResponse>, ApiError> {
    let session = find_session(&state, &user.id, &session_id).await?;
    Ok(data(session_detail(&state, session).await?))
}

async fn reorder_session(
    AppPath(session_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ReorderRequest>,
) -> Result<Data<SessionDetailResponse>, ApiError> {
    validate_payload(&payload)?;

    let session = rewrite_order(&state, &user.id, &session_id, |current| {
        session_order::validate_reorder(current, &payload.problem_ids)
    })
    .await?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        action = "session_reorder",
        "Reordered session"
    );

    Ok(data(session_detail(&state, session).await?))
}

async fn skip_problem(
    AppPath(session_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SkipRequest>,
) -> Result<Data<SessionDetailResponse>, ApiError> {
    let session = rewrite_order(&state, &user.id, &session_id, |current| {
        session_order::skip_to_end(current, &payload.problem_id)
    })
    .await?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        problem_id = %payload.problem_id,
        action = "session_skip",
        "Skipped problem"
    );

    Ok(data(session_detail(&state, session).await?))
}

async fn update_timer(
    AppPath(session_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SessionTimerUpdate>,
) -> Result<Data<SessionDetailResponse>, ApiError> {
    validate_payload(&payload)?;

    let session = find_session(&state, &user.id, &session_id).await?;
    if session.completed_at.is_some() {
        return Err(ApiError::Conflict("Session is already completed".to_string()));
    }

    let session = repositories::sessions::update_timer(
        state.db(),
        &session.id,
        payload.elapsed_time_seconds,
        payload.timer_state,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update session timer"))?
    .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    tracing::debug!(
        session_id = %session.id,
        elapsed = session.elapsed_time_seconds,
        "Session heartbeat"
    );

    Ok(data(session_detail(&state, session).await?))
}

async fn complete_session(
    AppPath(session_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<SessionDetailResponse>, ApiError> {
    let session = find_session(&state, &user.id, &session_id).await?;

    let session = repositories::sessions::complete(state.db(), &session.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to complete session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        action = "session_complete",
        "Completed session"
    );

    Ok(data(session_detail(&state, session).await?))
}

async fn delete_session(
    AppPath(session_id): AppPath<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::sessions::delete(state.db(), &user.id, &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete session"))?;
    if !deleted {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    tracing::info!(
        user_id = %user.id,
        session_id = %session_id,
        action = "session_delete",
        "Deleted session"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Locks the session row, derives the new order from the current one and
/// writes it back in the same transaction.
async fn rewrite_order<F>(
    state: &AppState,
    user_id: &str,
    session_id: &str,
    plan: F,
) -> Result<RevisionSession, ApiError>
where
    F: FnOnce(&[String]) -> Result<Vec<String>, OrderError>,
{
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start reorder"))?;

    let session = repositories::sessions::lock_owned(&mut *tx, user_id, session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    if session.completed_at.is_some() {
        return Err(ApiError::Conflict("Completed sessions cannot be reordered".to_string()));
    }

    let current = repositories::sessions::list_problem_ids(&mut *tx, &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session order"))?;
    let order = plan(&current).map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let updated = repositories::sessions::apply_order(&mut *tx, &session.id, &order)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store session order"))?;
    if updated != order.len() as u64 {
        return Err(ApiError::Conflict("Session changed during reorder, retry".to_string()));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit reorder"))?;
    Ok(session)
}

async fn find_session(
    state: &AppState,
    user_id: &str,
    session_id: &str,
) -> Result<RevisionSession, ApiError> {
    repositories::sessions::find_owned(state.db(), user_id, session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

async fn session_detail(
    state: &AppState,
    session: RevisionSession,
) -> Result<SessionDetailResponse, ApiError> {
    let problems = repositories::sessions::list_problems(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session problems"))?;
    Ok(SessionDetailResponse::from_db(session, problems))
}

fn find_template(key: &str) -> Result<&'static SessionTemplate, ApiError> {
    templates::find(key).ok_or_else(|| ApiError::BadRequest(format!("Unknown template '{key}'")))
}

fn default_session_name(template: &SessionTemplate, date: time::Date) -> String {
    format!("{} {date}", template.display_name)
}

#[cfg(test)]
mod tests;
