use sqlx::PgPool;
use time::{Date, PrimitiveDateTime};

use crate::db::models::Attempt;
use crate::db::types::{AttemptOutcome, TimerState};

const COLUMNS: &str = "\
    id, user_id, problem_id, session_id, status, outcome, confidence_score, duration_seconds, \
    notes, elapsed_time_seconds, timer_state, timer_last_updated_at, started_at, performed_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AttemptHistoryRow {
    pub(crate) problem_id: String,
    pub(crate) outcome: AttemptOutcome,
    pub(crate) confidence_score: i32,
}

pub(crate) struct CreateCompletedAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) problem_id: &'a str,
    pub(crate) session_id: Option<&'a str>,
    pub(crate) outcome: AttemptOutcome,
    pub(crate) confidence_score: i32,
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) notes: Option<&'a str>,
    pub(crate) performed_at: PrimitiveDateTime,
}

pub(crate) async fn create_completed(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateCompletedAttempt<'_>,
) -> Result<Attempt, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "INSERT INTO attempts (
            id, user_id, problem_id, session_id, status, outcome, confidence_score,
            duration_seconds, notes, elapsed_time_seconds, timer_state, timer_last_updated_at,
            started_at, performed_at
        ) VALUES ($1,$2,$3,$4,'completed',$5,$6,$7,$8,COALESCE($7, 0),'stopped',$9,$9,$9)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.problem_id)
    .bind(params.session_id)
    .bind(params.outcome)
    .bind(params.confidence_score)
    .bind(params.duration_seconds)
    .bind(params.notes)
    .bind(params.performed_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct StartAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) problem_id: &'a str,
    pub(crate) session_id: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

/// Returns `None` when an in-progress attempt already exists for the problem.
pub(crate) async fn start(
    executor: impl sqlx::PgExecutor<'_>,
    params: StartAttempt<'_>,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "INSERT INTO attempts (
            id, user_id, problem_id, session_id, status, elapsed_time_seconds, timer_state,
            timer_last_updated_at, started_at
        ) VALUES ($1,$2,$3,$4,'in_progress',0,'running',$5,$5)
        ON CONFLICT (user_id, problem_id) WHERE status = 'in_progress' DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.problem_id)
    .bind(params.session_id)
    .bind(params.now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    problem_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts
         WHERE user_id = $1 AND problem_id = $2 AND status = 'in_progress'"
    ))
    .bind(user_id)
    .bind(problem_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_owned(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_owned(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE id = $1 AND user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn update_timer(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    elapsed_time_seconds: i64,
    timer_state: TimerState,
    now: PrimitiveDateTime,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE attempts
         SET elapsed_time_seconds = $2, timer_state = $3, timer_last_updated_at = $4
         WHERE id = $1 AND status = 'in_progress'
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(elapsed_time_seconds)
    .bind(timer_state)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CompleteAttempt<'a> {
    pub(crate) outcome: AttemptOutcome,
    pub(crate) confidence_score: i32,
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) notes: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

/// Freezes an in-progress attempt; duration falls back to the last heartbeat.
pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: CompleteAttempt<'_>,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE attempts
         SET status = 'completed',
             outcome = $2,
             confidence_score = $3,
             duration_seconds = COALESCE($4, elapsed_time_seconds),
             notes = COALESCE($5, notes),
             timer_state = 'stopped',
             timer_last_updated_at = $6,
             performed_at = $6
         WHERE id = $1 AND status = 'in_progress'
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(params.outcome)
    .bind(params.confidence_score)
    .bind(params.duration_seconds)
    .bind(params.notes)
    .bind(params.now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attempts WHERE id = $1 AND status = 'in_progress'")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_completed(
    pool: &PgPool,
    user_id: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts
         WHERE user_id = $1 AND status = 'completed'
         ORDER BY performed_at DESC, id DESC
         OFFSET $2 LIMIT $3"
    ))
    .bind(user_id)
    .bind(offset.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_completed(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND status = 'completed'")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_completed_for_problem(
    pool: &PgPool,
    user_id: &str,
    problem_id: &str,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts
         WHERE user_id = $1 AND problem_id = $2 AND status = 'completed'
         ORDER BY performed_at DESC, id DESC"
    ))
    .bind(user_id)
    .bind(problem_id)
    .fetch_all(pool)
    .await
}

/// Completed attempts oldest first, the order the review schedule is replayed in.
pub(crate) async fn history_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<AttemptHistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptHistoryRow>(
        "SELECT problem_id, outcome, confidence_score
         FROM attempts
         WHERE user_id = $1 AND status = 'completed'
         ORDER BY performed_at ASC, id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn history_for_problem(
    pool: &PgPool,
    problem_id: &str,
) -> Result<Vec<AttemptHistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptHistoryRow>(
        "SELECT problem_id, outcome, confidence_score
         FROM attempts
         WHERE problem_id = $1 AND status = 'completed'
         ORDER BY performed_at ASC, id ASC",
    )
    .bind(problem_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn practice_days(pool: &PgPool, user_id: &str) -> Result<Vec<Date>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT performed_at::DATE
         FROM attempts
         WHERE user_id = $1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
