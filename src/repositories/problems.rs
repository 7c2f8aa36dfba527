use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Problem;
use crate::db::types::{AttemptOutcome, DifficultyLevel};

const COLUMNS: &str = "id, user_id, title, source, url, difficulty, created_at, updated_at";

/// Problem row joined with aggregates over its completed attempts.
const STATS_SELECT: &str = "\
    SELECT p.id, p.user_id, p.title, p.source, p.url, p.difficulty, p.created_at, p.updated_at,
           agg.total_attempts,
           agg.passed_attempts,
           latest.confidence_score AS latest_confidence,
           agg.avg_confidence,
           latest.performed_at AS last_attempt_at,
           latest.outcome AS last_outcome,
           agg.avg_duration_seconds,
           COALESCE(links.pattern_ids, ARRAY[]::VARCHAR[]) AS pattern_ids
    FROM problems p
    LEFT JOIN LATERAL (
        SELECT COUNT(*) AS total_attempts,
               COUNT(*) FILTER (WHERE a.outcome = 'passed') AS passed_attempts,
               AVG(a.confidence_score)::DOUBLE PRECISION AS avg_confidence,
               AVG(a.duration_seconds)::DOUBLE PRECISION AS avg_duration_seconds
        FROM attempts a
        WHERE a.problem_id = p.id AND a.status = 'completed'
    ) agg ON TRUE
    LEFT JOIN LATERAL (
        SELECT a.confidence_score, a.performed_at, a.outcome
        FROM attempts a
        WHERE a.problem_id = p.id AND a.status = 'completed'
        ORDER BY a.performed_at DESC, a.id DESC
        LIMIT 1
    ) latest ON TRUE
    LEFT JOIN LATERAL (
        SELECT ARRAY_AGG(pp.pattern_id ORDER BY pp.pattern_id) AS pattern_ids
        FROM problem_patterns pp
        WHERE pp.problem_id = p.id
    ) links ON TRUE
    WHERE p.user_id = ";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ProblemStatsRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) total_attempts: i64,
    pub(crate) passed_attempts: i64,
    pub(crate) latest_confidence: Option<i32>,
    pub(crate) avg_confidence: Option<f64>,
    pub(crate) last_attempt_at: Option<PrimitiveDateTime>,
    pub(crate) last_outcome: Option<AttemptOutcome>,
    pub(crate) avg_duration_seconds: Option<f64>,
    pub(crate) pattern_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SolveStatus {
    Unsolved,
    Solved,
}

#[derive(Debug, Default)]
pub(crate) struct ProblemFilter {
    pub(crate) query: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) status: Option<SolveStatus>,
}

pub(crate) struct CreateProblem<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) source: Option<&'a str>,
    pub(crate) url: Option<&'a str>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateProblem<'_>,
) -> Result<Problem, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "INSERT INTO problems (id, user_id, title, source, url, difficulty, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.title)
    .bind(params.source)
    .bind(params.url)
    .bind(params.difficulty)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateProblem<'a> {
    pub(crate) title: &'a str,
    pub(crate) source: Option<&'a str>,
    pub(crate) url: Option<&'a str>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    id: &str,
    params: UpdateProblem<'_>,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "UPDATE problems
         SET title = $1, source = $2, url = $3, difficulty = $4, updated_at = $5
         WHERE id = $6 AND user_id = $7
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.source)
    .bind(params.url)
    .bind(params.difficulty)
    .bind(params.now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_owned(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    id: &str,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS} FROM problems WHERE id = $1 AND user_id = $2"
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
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS} FROM problems WHERE id = $1 AND user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_owned_by_ids(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    ids: &[String],
) -> Result<Vec<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS} FROM problems WHERE user_id = $1 AND id = ANY($2)"
    ))
    .bind(user_id)
    .bind(ids)
    .fetch_all(executor)
    .await
}

pub(crate) async fn replace_patterns(
    executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    problem_id: &str,
    pattern_ids: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM problem_patterns WHERE problem_id = $1")
        .bind(problem_id)
        .execute(&mut **executor)
        .await?;

    sqlx::query(
        "INSERT INTO problem_patterns (problem_id, pattern_id)
         SELECT $1, pattern_id FROM UNNEST($2::VARCHAR[]) AS pattern_id
         ON CONFLICT DO NOTHING",
    )
    .bind(problem_id)
    .bind(pattern_ids)
    .execute(&mut **executor)
    .await?;

    Ok(())
}

pub(crate) async fn count_attempts(
    executor: impl sqlx::PgExecutor<'_>,
    problem_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE problem_id = $1")
        .bind(problem_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM problems WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_with_stats(
    pool: &PgPool,
    user_id: &str,
    id: &str,
) -> Result<Option<ProblemStatsRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(STATS_SELECT);
    builder.push_bind(user_id);
    builder.push(" AND p.id = ");
    builder.push_bind(id);

    builder.build_query_as::<ProblemStatsRow>().fetch_optional(pool).await
}

/// Every problem the user owns, used for ranking and session generation.
pub(crate) async fn list_all_with_stats(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<ProblemStatsRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(STATS_SELECT);
    builder.push_bind(user_id);
    builder.push(" ORDER BY p.id");

    builder.build_query_as::<ProblemStatsRow>().fetch_all(pool).await
}

pub(crate) async fn list_with_stats(
    pool: &PgPool,
    user_id: &str,
    filter: &ProblemFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<ProblemStatsRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(STATS_SELECT);
    builder.push_bind(user_id);
    push_filters(&mut builder, filter);

    builder.push(" ORDER BY p.created_at DESC, p.id OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ProblemStatsRow>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    user_id: &str,
    filter: &ProblemFilter,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM problems p WHERE p.user_id = ");
    builder.push_bind(user_id);
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProblemFilter) {
    if let Some(query) = filter.query.as_deref().map(str::trim).filter(|query| !query.is_empty()) {
        builder.push(" AND p.title ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(query)));
        builder.push(" ESCAPE '\\'");
    }

    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND p.difficulty = ");
        builder.push_bind(difficulty);
    }

    match filter.status {
        Some(SolveStatus::Solved) => {
            builder.push(
                " AND EXISTS (SELECT 1 FROM attempts s
                  WHERE s.problem_id = p.id AND s.status = 'completed' AND s.outcome = 'passed')",
            );
        }
        Some(SolveStatus::Unsolved) => {
            builder.push(
                " AND NOT EXISTS (SELECT 1 FROM attempts s
                  WHERE s.problem_id = p.id AND s.status = 'completed' AND s.outcome = 'passed')",
            );
        }
        None => {}
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("two_sum 100%"), "two\\_sum 100\\%");
        assert_eq!(escape_like("plain"), "plain");
    }
}
