use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::RevisionSession;
use crate::db::types::{DifficultyLevel, TimerState};
use crate::repositories::sessions::{SessionProblemRow, SessionSummaryRow};
use crate::services::scoring::Emphasis;
use crate::services::session_generator::{GeneratedSession, PlannedProblem};
use crate::services::templates::{SessionTemplate, TemplateCategory};

#[derive(Debug, Serialize)]
pub(crate) struct TemplateResponse {
    pub(crate) key: &'static str,
    pub(crate) display_name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) category: TemplateCategory,
    pub(crate) duration_min: u32,
    pub(crate) max_difficulty: DifficultyLevel,
    pub(crate) max_same_pattern: u32,
    pub(crate) min_quick_wins: u32,
    pub(crate) emphasis: Emphasis,
    pub(crate) requires_pattern: bool,
}

impl TemplateResponse {
    pub(crate) fn from_template(template: &'static SessionTemplate) -> Self {
        Self {
            key: template.key,
            display_name: template.display_name,
            description: template.description,
            category: template.category,
            duration_min: template.duration_min,
            max_difficulty: template.max_difficulty,
            max_same_pattern: template.max_same_pattern,
            min_quick_wins: template.min_quick_wins,
            emphasis: template.emphasis,
            requires_pattern: template.requires_pattern(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateGroupResponse {
    pub(crate) category: TemplateCategory,
    pub(crate) templates: Vec<TemplateResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GenerateRequest {
    pub(crate) template_key: String,
    #[serde(default)]
    pub(crate) pattern_id: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 600, message = "duration_min must be in range 1..600"))]
    pub(crate) duration_min: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeneratedProblemResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) source: Option<String>,
    pub(crate) planned_min: u32,
    pub(crate) score: f64,
    pub(crate) days_since_last: Option<i64>,
    pub(crate) confidence: Option<i32>,
    pub(crate) reason: String,
    pub(crate) order_index: usize,
}

impl GeneratedProblemResponse {
    fn from_planned(problem: PlannedProblem) -> Self {
        Self {
            id: problem.problem_id,
            title: problem.title,
            difficulty: problem.difficulty,
            source: problem.source,
            planned_min: problem.planned_min,
            score: problem.score,
            days_since_last: problem.days_since_last,
            confidence: problem.confidence,
            reason: problem.reason,
            order_index: problem.order_index,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GeneratedSessionResponse {
    pub(crate) template_key: &'static str,
    pub(crate) template_name: &'static str,
    pub(crate) template_description: &'static str,
    pub(crate) planned_duration_min: u32,
    pub(crate) total_planned_min: u32,
    pub(crate) problems: Vec<GeneratedProblemResponse>,
}

impl GeneratedSessionResponse {
    pub(crate) fn from_generated(session: GeneratedSession) -> Self {
        Self {
            template_key: session.template.key,
            template_name: session.template.display_name,
            template_description: session.template.description,
            planned_duration_min: session.planned_duration_min,
            total_planned_min: session.total_planned_min,
            problems: session
                .problems
                .into_iter()
                .map(GeneratedProblemResponse::from_planned)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionCreate {
    pub(crate) template_key: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "session_name must be 1..255 characters"))]
    pub(crate) session_name: Option<String>,
    #[validate(range(min = 1, max = 600, message = "planned_duration_min must be in range 1..600"))]
    pub(crate) planned_duration_min: i32,
    #[validate(length(min = 1, max = 100, message = "problem_ids must contain 1..100 items"))]
    pub(crate) problem_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ReorderRequest {
    #[validate(length(min = 1, max = 100, message = "problem_ids must contain 1..100 items"))]
    pub(crate) problem_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SkipRequest {
    pub(crate) problem_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionTimerUpdate {
    #[validate(range(min = 0, message = "elapsed_time_seconds must not be negative"))]
    pub(crate) elapsed_time_seconds: i64,
    pub(crate) timer_state: TimerState,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionSummaryResponse {
    pub(crate) id: String,
    pub(crate) template_key: String,
    pub(crate) session_name: String,
    pub(crate) planned_duration_min: i32,
    pub(crate) total_planned_min: i64,
    pub(crate) problem_count: i64,
    pub(crate) completed_at: Option<String>,
    pub(crate) created_at: String,
}

impl SessionSummaryResponse {
    pub(crate) fn from_row(row: SessionSummaryRow) -> Self {
        Self {
            id: row.id,
            template_key: row.template_key,
            session_name: row.session_name,
            planned_duration_min: row.planned_duration_min,
            total_planned_min: row.total_planned_min,
            problem_count: row.problem_count,
            completed_at: row.completed_at.map(format_primitive),
            created_at: format_primitive(row.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionProblemResponse {
    pub(crate) id: String,
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

impl SessionProblemResponse {
    fn from_row(row: SessionProblemRow) -> Self {
        Self {
            id: row.problem_id,
            title: row.title,
            source: row.source,
            url: row.url,
            difficulty: row.difficulty,
            order_index: row.order_index,
            planned_min: row.planned_min,
            score: row.score,
            reason: row.reason,
            completed: row.completed,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionDetailResponse {
    pub(crate) id: String,
    pub(crate) template_key: String,
    pub(crate) session_name: String,
    pub(crate) planned_duration_min: i32,
    pub(crate) total_planned_min: i64,
    pub(crate) completed_at: Option<String>,
    pub(crate) elapsed_time_seconds: i64,
    pub(crate) timer_state: TimerState,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) problems: Vec<SessionProblemResponse>,
}

impl SessionDetailResponse {
    pub(crate) fn from_db(session: RevisionSession, problems: Vec<SessionProblemRow>) -> Self {
        let total_planned_min = problems.iter().map(|problem| i64::from(problem.planned_min)).sum();
        Self {
            id: session.id,
            template_key: session.template_key,
            session_name: session.session_name,
            planned_duration_min: session.planned_duration_min,
            total_planned_min,
            completed_at: session.completed_at.map(format_primitive),
            elapsed_time_seconds: session.elapsed_time_seconds,
            timer_state: session.timer_state,
            created_at: format_primitive(session.created_at),
            updated_at: format_primitive(session.updated_at),
            problems: problems.into_iter().map(SessionProblemResponse::from_row).collect(),
        }
    }
}
