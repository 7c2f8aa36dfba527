use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Pattern;

const COLUMNS: &str = "id, user_id, title, description, created_at, updated_at";

/// Stats are scoped to the viewer: only their problems and attempts count.
const STATS_SELECT: &str = "\
    WITH latest AS (
        SELECT DISTINCT ON (a.problem_id) a.problem_id, a.confidence_score
        FROM attempts a
        WHERE a.user_id = $1 AND a.status = 'completed'
        ORDER BY a.problem_id, a.performed_at DESC, a.id DESC
    ),
    usage AS (
        SELECT pp.pattern_id,
               COUNT(DISTINCT pr.id) AS problem_count,
               AVG(latest.confidence_score)::DOUBLE PRECISION AS avg_confidence
        FROM problem_patterns pp
        JOIN problems pr ON pr.id = pp.problem_id AND pr.user_id = $1
        LEFT JOIN latest ON latest.problem_id = pr.id
        GROUP BY pp.pattern_id
    ),
    revisions AS (
        SELECT pp.pattern_id,
               COUNT(a.id) AS times_revised,
               MAX(a.performed_at) AS last_revised_at
        FROM problem_patterns pp
        JOIN attempts a
          ON a.problem_id = pp.problem_id AND a.user_id = $1 AND a.status = 'completed'
        GROUP BY pp.pattern_id
    )
    SELECT p.id, p.user_id, p.title, p.description, p.created_at, p.updated_at,
           COALESCE(usage.problem_count, 0) AS problem_count,
           usage.avg_confidence,
           COALESCE(revisions.times_revised, 0) AS times_revised,
           revisions.last_revised_at
    FROM patterns p
    LEFT JOIN usage ON usage.pattern_id = p.id
    LEFT JOIN revisions ON revisions.pattern_id = p.id
    WHERE (p.user_id IS NULL OR p.user_id = $1)";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PatternStatsRow {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) problem_count: i64,
    pub(crate) avg_confidence: Option<f64>,
    pub(crate) times_revised: i64,
    pub(crate) last_revised_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LinkedPatternRow {
    pub(crate) problem_id: String,
    pub(crate) id: String,
    pub(crate) title: String,
}

pub(crate) async fn list_visible_with_stats(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<PatternStatsRow>, sqlx::Error> {
    sqlx::query_as::<_, PatternStatsRow>(&format!("{STATS_SELECT} ORDER BY lower(p.title), p.id"))
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub(crate) async fn find_visible_with_stats(
    pool: &PgPool,
    user_id: &str,
    id: &str,
) -> Result<Option<PatternStatsRow>, sqlx::Error> {
    sqlx::query_as::<_, PatternStatsRow>(&format!("{STATS_SELECT} AND p.id = $2"))
        .bind(user_id)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_visible(
    pool: &PgPool,
    user_id: &str,
    id: &str,
) -> Result<Option<Pattern>, sqlx::Error> {
    sqlx::query_as::<_, Pattern>(&format!(
        "SELECT {COLUMNS} FROM patterns WHERE id = $1 AND (user_id IS NULL OR user_id = $2)"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn count_visible(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    ids: &[String],
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM patterns WHERE id = ANY($1) AND (user_id IS NULL OR user_id = $2)",
    )
    .bind(ids)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_problems(
    pool: &PgPool,
    problem_ids: &[String],
) -> Result<Vec<LinkedPatternRow>, sqlx::Error> {
    sqlx::query_as::<_, LinkedPatternRow>(
        "SELECT pp.problem_id, p.id, p.title
         FROM problem_patterns pp
         JOIN patterns p ON p.id = pp.pattern_id
         WHERE pp.problem_id = ANY($1)
         ORDER BY pp.problem_id, lower(p.title)",
    )
    .bind(problem_ids)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreatePattern<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreatePattern<'_>,
) -> Result<Pattern, sqlx::Error> {
    sqlx::query_as::<_, Pattern>(&format!(
        "INSERT INTO patterns (id, user_id, title, description, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdatePattern<'a> {
    pub(crate) title: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdatePattern<'_>,
) -> Result<Option<Pattern>, sqlx::Error> {
    sqlx::query_as::<_, Pattern>(&format!(
        "UPDATE patterns
         SET title = COALESCE($1, title),
             description = COALESCE($2, description),
             updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Links to problems are removed by cascade.
pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM patterns WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
