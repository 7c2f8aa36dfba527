use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::RevisionSession;
use crate::db::types::{DifficultyLevel, TimerState};

const COLUMNS: &str = "\
    id, user_id, template_key, session_name, planned_duration_min, completed_at, \
    elapsed_time_seconds, timer_state, timer_last_updated_at, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SessionSummaryRow {
    pub(crate) id: String,
    pub(crate) template_key: String,
    pub(crate) session_name: String,
    pub(crate) planned_duration_min: i32,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) problem_count: i64,
    pub(crate) total_planned_min: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SessionProblemRow {
    pub(crate) problem_id: String,
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) order_index: i32,
    pub(crate) planned_min: i32,
    pub(crate) score: f64,
    pub(crate) reason: String,
    pub(crate) completed: bool,
}

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) template_key: &'a str,
    pub(crate) session_name: &'a str,
    pub(crate) planned_duration_min: i32,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct SessionItem<'a> {
    pub(crate) problem_id: &'a str,
    pub(crate) planned_min: i32,
    pub(crate) score: f64,
    pub(crate) reason: &'a str,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSession<'_>,
) -> Result<RevisionSession, sqlx::Error> {
    sqlx::query_as::<_, RevisionSession>(&format!(
        "INSERT INTO revision_sessions (
            id, user_id, template_key, session_name, planned_duration_min,
            elapsed_time_seconds, timer_state, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,0,'idle',$6,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.template_key)
    .bind(params.session_name)
    .bind(params.planned_duration_min)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

/// Inserts items in slice order as `order_index` 0..N-1.
pub(crate) async fn insert_problems(
    executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session_id: &str,
    items: &[SessionItem<'_>],
) -> Result<(), sqlx::Error> {
    for (order_index, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO session_problems (
                session_id, problem_id, order_index, planned_min, score, reason
             ) VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(session_id)
        .bind(item.problem_id)
        .bind(order_index as i32)
        .bind(item.planned_min)
        .bind(item.score)
        .bind(item.reason)
        .execute(&mut **executor)
        .await?;
    }

    Ok(())
}

pub(crate) async fn find_owned(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    id: &str,
) -> Result<Option<RevisionSession>, sqlx::Error> {
    sqlx::query_as::<_, RevisionSession>(&format!(
        "SELECT {COLUMNS} FROM revision_sessions WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Row lock serializing concurrent reorder and skip requests on one session.
pub(crate) async fn lock_owned(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    id: &str,
) -> Result<Option<RevisionSession>, sqlx::Error> {
    sqlx::query_as::<_, RevisionSession>(&format!(
        "SELECT {COLUMNS} FROM revision_sessions WHERE id = $1 AND user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<SessionSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, SessionSummaryRow>(
        "SELECT rs.id,
                rs.template_key,
                rs.session_name,
                rs.planned_duration_min,
                rs.completed_at,
                rs.created_at,
                COUNT(sp.problem_id) AS problem_count,
                COALESCE(SUM(sp.planned_min), 0)::BIGINT AS total_planned_min
         FROM revision_sessions rs
         LEFT JOIN session_problems sp ON sp.session_id = rs.id
         WHERE rs.user_id = $1
         GROUP BY rs.id
         ORDER BY rs.created_at DESC, rs.id
         OFFSET $2
         LIMIT $3",
    )
    .bind(user_id)
    .bind(offset.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_for_user(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM revision_sessions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_problem_ids(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT problem_id FROM session_problems WHERE session_id = $1 ORDER BY order_index",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_problems(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<SessionProblemRow>, sqlx::Error> {
    sqlx::query_as::<_, SessionProblemRow>(
        "SELECT sp.problem_id,
                p.title,
                p.source,
                p.url,
                p.difficulty,
                sp.order_index,
                sp.planned_min,
                sp.score,
                sp.reason,
                EXISTS (
                    SELECT 1 FROM attempts a
                    WHERE a.session_id = sp.session_id
                      AND a.problem_id = sp.problem_id
                      AND a.status = 'completed'
                ) AS completed
         FROM session_problems sp
         JOIN problems p ON p.id = sp.problem_id
         WHERE sp.session_id = $1
         ORDER BY sp.order_index",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn contains_problem(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    problem_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM session_problems WHERE session_id = $1 AND problem_id = $2
         )",
    )
    .bind(session_id)
    .bind(problem_id)
    .fetch_one(executor)
    .await
}

/// Rewrites `order_index` to match `problem_ids` in one statement. The
/// deferrable unique constraint is checked once the statement finishes.
pub(crate) async fn apply_order(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    problem_ids: &[String],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE session_problems sp
         SET order_index = (ordered.position - 1)::INTEGER
         FROM UNNEST($2::VARCHAR[]) WITH ORDINALITY AS ordered(problem_id, position)
         WHERE sp.session_id = $1 AND sp.problem_id = ordered.problem_id",
    )
    .bind(session_id)
    .bind(problem_ids)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Closes gaps left after a member row was deleted.
pub(crate) async fn recompact(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE session_problems sp
         SET order_index = ranked.new_index
         FROM (
             SELECT problem_id,
                    (ROW_NUMBER() OVER (ORDER BY order_index) - 1)::INTEGER AS new_index
             FROM session_problems
             WHERE session_id = $1
         ) ranked
         WHERE sp.session_id = $1
           AND sp.problem_id = ranked.problem_id
           AND sp.order_index <> ranked.new_index",
    )
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_ids_containing(
    executor: impl sqlx::PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT session_id FROM session_problems WHERE problem_id = $1 ORDER BY session_id",
    )
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn update_timer(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    elapsed_time_seconds: i64,
    timer_state: TimerState,
    now: PrimitiveDateTime,
) -> Result<Option<RevisionSession>, sqlx::Error> {
    sqlx::query_as::<_, RevisionSession>(&format!(
        "UPDATE revision_sessions
         SET elapsed_time_seconds = $2, timer_state = $3, timer_last_updated_at = $4, updated_at = $4
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(elapsed_time_seconds)
    .bind(timer_state)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<RevisionSession>, sqlx::Error> {
    sqlx::query_as::<_, RevisionSession>(&format!(
        "UPDATE revision_sessions
         SET completed_at = COALESCE(completed_at, $2),
             timer_state = 'stopped',
             timer_last_updated_at = $2,
             updated_at = $2
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(now)
    .fetch_optional(executor)
    .await
}

/// Attempts recorded inside the session keep their data; `session_id` is cleared.
pub(crate) async fn delete(pool: &PgPool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM revision_sessions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
