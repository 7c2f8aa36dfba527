use serde::Serialize;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptOutcome, AttemptStatus, DifficultyLevel, TimerState, UserRole};

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RefreshToken {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) token_hash: String,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) revoked_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Problem {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Pattern {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) problem_id: String,
    pub(crate) session_id: Option<String>,
    pub(crate) status: AttemptStatus,
    pub(crate) outcome: Option<AttemptOutcome>,
    pub(crate) confidence_score: Option<i32>,
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) notes: Option<String>,
    pub(crate) elapsed_time_seconds: i64,
    pub(crate) timer_state: TimerState,
    pub(crate) timer_last_updated_at: Option<PrimitiveDateTime>,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) performed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct RevisionSession {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) template_key: String,
    pub(crate) session_name: String,
    pub(crate) planned_duration_min: i32,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) elapsed_time_seconds: i64,
    pub(crate) timer_state: TimerState,
    pub(crate) timer_last_updated_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
