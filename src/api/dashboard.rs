use axum::{extract::State, routing::get, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::response::{data, Data};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::patterns::PatternStatsRow;
use crate::schemas::dashboard::{DashboardStatsResponse, WeakestPatternResponse};
use crate::services::streak;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

async fn stats(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<DashboardStatsResponse>, ApiError> {
    let counts = repositories::stats::dashboard_counts(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load dashboard counts"))?;
    let practice_days = repositories::attempts::practice_days(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load practice days"))?;
    let patterns = repositories::patterns::list_visible_with_stats(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load pattern stats"))?;

    let today = primitive_now_utc().date();

    Ok(data(DashboardStatsResponse {
        total_problems: counts.total_problems,
        mastered_problems: counts.mastered_problems,
        avg_confidence: counts.avg_confidence.unwrap_or(0.0),
        current_streak: streak::current_streak(&practice_days, today),
        total_sessions: counts.total_sessions,
        completed_sessions: counts.completed_sessions,
        total_attempts: counts.total_attempts,
        weakest_pattern: weakest_pattern(&patterns),
    }))
}

/// Lowest average confidence among patterns that have been revised at least once.
fn weakest_pattern(patterns: &[PatternStatsRow]) -> Option<WeakestPatternResponse> {
    patterns
        .iter()
        .filter(|pattern| pattern.times_revised > 0)
        .filter_map(|pattern| pattern.avg_confidence.map(|avg| (pattern, avg)))
        .min_by(|(left, left_avg), (right, right_avg)| {
            left_avg.total_cmp(right_avg).then_with(|| left.title.cmp(&right.title))
        })
        .map(|(pattern, avg)| WeakestPatternResponse {
            id: pattern.id.clone(),
            title: pattern.title.clone(),
            avg_confidence: avg,
        })
}

#[cfg(test)]
mod tests;
