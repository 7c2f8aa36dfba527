use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct DashboardCountsRow {
    pub(crate) total_problems: i64,
    pub(crate) mastered_problems: i64,
    pub(crate) avg_confidence: Option<f64>,
    pub(crate) total_attempts: i64,
    pub(crate) total_sessions: i64,
    pub(crate) completed_sessions: i64,
}

/// Mastery and average confidence look only at each problem's latest completed attempt.
pub(crate) async fn dashboard_counts(
    pool: &PgPool,
    user_id: &str,
) -> Result<DashboardCountsRow, sqlx::Error> {
    sqlx::query_as::<_, DashboardCountsRow>(
        "WITH latest AS (
            SELECT DISTINCT ON (a.problem_id) a.problem_id, a.confidence_score, a.outcome
            FROM attempts a
            WHERE a.user_id = $1 AND a.status = 'completed'
            ORDER BY a.problem_id, a.performed_at DESC, a.id DESC
         )
         SELECT
            (SELECT COUNT(*) FROM problems WHERE user_id = $1) AS total_problems,
            (SELECT COUNT(*) FROM latest
              WHERE outcome = 'passed' AND confidence_score >= 80) AS mastered_problems,
            (SELECT AVG(confidence_score)::DOUBLE PRECISION FROM latest) AS avg_confidence,
            (SELECT COUNT(*) FROM attempts
              WHERE user_id = $1 AND status = 'completed') AS total_attempts,
            (SELECT COUNT(*) FROM revision_sessions WHERE user_id = $1) AS total_sessions,
            (SELECT COUNT(*) FROM revision_sessions
              WHERE user_id = $1 AND completed_at IS NOT NULL) AS completed_sessions",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}
