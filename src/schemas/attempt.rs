use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Attempt;
use crate::db::types::{AttemptOutcome, AttemptStatus, TimerState};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptCreate {
    pub(crate) problem_id: String,
    #[serde(default)]
    pub(crate) session_id: Option<String>,
    #[validate(range(min = 0, max = 100, message = "confidence_score must be in range 0..100"))]
    pub(crate) confidence_score: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "duration_seconds must not be negative"))]
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) outcome: AttemptOutcome,
    #[serde(default)]
    #[validate(length(max = 10000, message = "notes must be at most 10000 characters"))]
    pub(crate) notes: Option<String>,
    /// RFC 3339; defaults to now.
    #[serde(default)]
    pub(crate) performed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptStart {
    pub(crate) problem_id: String,
    #[serde(default)]
    pub(crate) session_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TimerUpdate {
    #[validate(range(min = 0, message = "elapsed_time_seconds must not be negative"))]
    pub(crate) elapsed_time_seconds: i64,
    pub(crate) timer_state: TimerState,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptComplete {
    #[validate(range(min = 0, max = 100, message = "confidence_score must be in range 0..100"))]
    pub(crate) confidence_score: i32,
    pub(crate) outcome: AttemptOutcome,
    #[serde(default)]
    #[validate(length(max = 10000, message = "notes must be at most 10000 characters"))]
    pub(crate) notes: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "duration_seconds must not be negative"))]
    pub(crate) duration_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InProgressQuery {
    pub(crate) problem_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) problem_id: String,
    pub(crate) session_id: Option<String>,
    pub(crate) status: AttemptStatus,
    pub(crate) outcome: Option<AttemptOutcome>,
    pub(crate) confidence_score: Option<i32>,
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) notes: Option<String>,
    pub(crate) elapsed_time_seconds: i64,
    pub(crate) timer_state: TimerState,
    pub(crate) started_at: String,
    pub(crate) performed_at: Option<String>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            problem_id: attempt.problem_id,
            session_id: attempt.session_id,
            status: attempt.status,
            outcome: attempt.outcome,
            confidence_score: attempt.confidence_score,
            duration_seconds: attempt.duration_seconds,
            notes: attempt.notes,
            elapsed_time_seconds: attempt.elapsed_time_seconds,
            timer_state: attempt.timer_state,
            started_at: format_primitive(attempt.started_at),
            performed_at: attempt.performed_at.map(format_primitive),
        }
    }
}
