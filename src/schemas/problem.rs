use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::{AttemptOutcome, DifficultyLevel};
use crate::repositories::problems::{ProblemStatsRow, SolveStatus};
use crate::services::scoring::ReviewSchedule;
use crate::services::session_generator::RankedCandidate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProblemWrite {
    #[validate(length(min = 1, max = 255, message = "title must be 1..255 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "source must be at most 255 characters"))]
    pub(crate) source: Option<String>,
    #[serde(default)]
    #[validate(url(message = "url must be a valid URL"))]
    pub(crate) url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    #[serde(default)]
    #[validate(length(max = 50, message = "at most 50 patterns per problem"))]
    pub(crate) pattern_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PatternRef {
    pub(crate) id: String,
    pub(crate) title: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) status: SolveStatus,
    pub(crate) patterns: Vec<PatternRef>,
    pub(crate) total_attempts: i64,
    pub(crate) latest_confidence: Option<i32>,
    pub(crate) avg_confidence: Option<f64>,
    pub(crate) last_attempt_at: Option<String>,
    pub(crate) last_outcome: Option<AttemptOutcome>,
    pub(crate) avg_duration_seconds: Option<f64>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ProblemResponse {
    pub(crate) fn from_row(row: ProblemStatsRow, patterns: Vec<PatternRef>) -> Self {
        Self {
            status: if row.passed_attempts > 0 { SolveStatus::Solved } else { SolveStatus::Unsolved },
            id: row.id,
            title: row.title,
            source: row.source,
            url: row.url,
            difficulty: row.difficulty,
            patterns,
            total_attempts: row.total_attempts,
            latest_confidence: row.latest_confidence,
            avg_confidence: row.avg_confidence,
            last_attempt_at: row.last_attempt_at.map(format_primitive),
            last_outcome: row.last_outcome,
            avg_duration_seconds: row.avg_duration_seconds,
            created_at: format_primitive(row.created_at),
            updated_at: format_primitive(row.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewScheduleResponse {
    pub(crate) interval_days: i32,
    pub(crate) ease_factor: f64,
    pub(crate) review_count: i32,
    pub(crate) next_review_at: Option<String>,
}

impl ReviewScheduleResponse {
    pub(crate) fn from_schedule(
        schedule: ReviewSchedule,
        last_attempt_at: Option<time::PrimitiveDateTime>,
    ) -> Self {
        Self {
            interval_days: schedule.interval_days,
            ease_factor: schedule.ease_factor,
            review_count: schedule.review_count,
            next_review_at: last_attempt_at
                .map(|last| format_primitive(schedule.next_review_at(last))),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemDetailResponse {
    #[serde(flatten)]
    pub(crate) problem: ProblemResponse,
    pub(crate) schedule: Option<ReviewScheduleResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UrgentProblemResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) score: f64,
    pub(crate) days_since_last: Option<i64>,
    pub(crate) confidence: Option<i32>,
    pub(crate) reason: String,
}

impl UrgentProblemResponse {
    pub(crate) fn from_ranked(ranked: RankedCandidate) -> Self {
        let candidate = ranked.candidate;
        Self {
            days_since_last: candidate.recency.whole_days(),
            id: candidate.problem_id,
            title: candidate.title,
            source: candidate.source,
            difficulty: candidate.difficulty,
            score: ranked.score,
            confidence: candidate.confidence,
            reason: ranked.reason,
        }
    }
}
