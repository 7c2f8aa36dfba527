use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct WeakestPatternResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) avg_confidence: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardStatsResponse {
    pub(crate) total_problems: i64,
    pub(crate) mastered_problems: i64,
    pub(crate) avg_confidence: f64,
    pub(crate) current_streak: u32,
    pub(crate) total_sessions: i64,
    pub(crate) completed_sessions: i64,
    pub(crate) total_attempts: i64,
    pub(crate) weakest_pattern: Option<WeakestPatternResponse>,
}
