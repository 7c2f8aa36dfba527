use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::repositories::patterns::PatternStatsRow;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PatternCreate {
    #[validate(length(min = 1, max = 255, message = "title must be 1..255 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub(crate) description: Option<String>,
    /// Admin-only: create a pattern visible to every user.
    #[serde(default)]
    pub(crate) global: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PatternUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must be 1..255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PatternResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) is_global: bool,
    pub(crate) problem_count: i64,
    pub(crate) avg_confidence: Option<f64>,
    pub(crate) times_revised: i64,
    pub(crate) last_revised_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl PatternResponse {
    pub(crate) fn from_row(row: PatternStatsRow) -> Self {
        Self {
            is_global: row.user_id.is_none(),
            id: row.id,
            title: row.title,
            description: row.description,
            problem_count: row.problem_count,
            avg_confidence: row.avg_confidence,
            times_revised: row.times_revised,
            last_revised_at: row.last_revised_at.map(format_primitive),
            created_at: format_primitive(row.created_at),
            updated_at: format_primitive(row.updated_at),
        }
    }
}
