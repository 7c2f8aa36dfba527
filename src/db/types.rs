use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    User,
    Admin,
}

/// Ordered so that `Easy < Medium < Hard`; templates use this as a ceiling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attemptoutcome", rename_all = "lowercase")]
pub(crate) enum AttemptOutcome {
    Passed,
    Failed,
}

impl AttemptOutcome {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "timerstate", rename_all = "lowercase")]
pub(crate) enum TimerState {
    Idle,
    Running,
    Paused,
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_orders_easy_to_hard() {
        assert!(DifficultyLevel::Easy < DifficultyLevel::Medium);
        assert!(DifficultyLevel::Medium < DifficultyLevel::Hard);
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(AttemptStatus::InProgress).unwrap(), "in_progress");
        assert_eq!(serde_json::to_value(TimerState::Paused).unwrap(), "paused");
        let role: UserRole = serde_json::from_value(serde_json::json!("admin")).unwrap();
        assert_eq!(role, UserRole::Admin);
    }
}
