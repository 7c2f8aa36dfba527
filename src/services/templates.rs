use serde::Serialize;

use crate::db::types::DifficultyLevel;
use crate::services::scoring::Emphasis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TemplateCategory {
    Daily,
    Pattern,
    Weekend,
}

impl TemplateCategory {
    pub(crate) const ALL: [TemplateCategory; 3] = [Self::Daily, Self::Pattern, Self::Weekend];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Pattern => "pattern",
            Self::Weekend => "weekend",
        }
    }
}

/// Longest planned time that still counts as a quick win.
pub(crate) const QUICK_WIN_MAX_MIN: u32 = 15;

/// Built-in generation preset. Confidence bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionTemplate {
    pub(crate) key: &'static str,
    pub(crate) display_name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) category: TemplateCategory,
    pub(crate) duration_min: u32,
    pub(crate) max_difficulty: DifficultyLevel,
    pub(crate) max_same_pattern: u32,
    /// Selected problems planned at most `QUICK_WIN_MAX_MIN` minutes each.
    pub(crate) min_quick_wins: u32,
    pub(crate) emphasis: Emphasis,
    pub(crate) min_confidence: Option<i32>,
    pub(crate) max_confidence: Option<i32>,
    pub(crate) min_days_since_last: Option<u32>,
    pub(crate) progression: bool,
}

impl SessionTemplate {
    pub(crate) fn requires_pattern(&self) -> bool {
        self.category == TemplateCategory::Pattern
    }
}

pub(crate) const TEMPLATES: &[SessionTemplate] = &[
    SessionTemplate {
        key: "daily_revision",
        display_name: "Daily Revision",
        description: "A short review of the most urgent easy and medium problems.",
        category: TemplateCategory::Daily,
        duration_min: 35,
        max_difficulty: DifficultyLevel::Medium,
        max_same_pattern: 2,
        min_quick_wins: 2,
        emphasis: Emphasis::Standard,
        min_confidence: None,
        max_confidence: None,
        min_days_since_last: None,
        progression: false,
    },
    SessionTemplate {
        key: "daily_mixed",
        display_name: "Daily Mixed",
        description: "A mixed set across all difficulties.",
        category: TemplateCategory::Daily,
        duration_min: 55,
        max_difficulty: DifficultyLevel::Hard,
        max_same_pattern: 2,
        min_quick_wins: 1,
        emphasis: Emphasis::Standard,
        min_confidence: None,
        max_confidence: None,
        min_days_since_last: None,
        progression: false,
    },
    SessionTemplate {
        key: "confidence_booster",
        display_name: "Confidence Booster",
        description: "Problems you already know reasonably well, to keep them sharp.",
        category: TemplateCategory::Daily,
        duration_min: 45,
        max_difficulty: DifficultyLevel::Medium,
        max_same_pattern: 2,
        min_quick_wins: 3,
        emphasis: Emphasis::Standard,
        min_confidence: Some(60),
        max_confidence: None,
        min_days_since_last: None,
        progression: false,
    },
    SessionTemplate {
        key: "weakness_crusher",
        display_name: "Weakness Crusher",
        description: "Low-confidence problems, weighted hardest toward what you struggle with.",
        category: TemplateCategory::Daily,
        duration_min: 45,
        max_difficulty: DifficultyLevel::Medium,
        max_same_pattern: 3,
        min_quick_wins: 1,
        emphasis: Emphasis::Confidence,
        min_confidence: None,
        max_confidence: Some(65),
        min_days_since_last: None,
        progression: false,
    },
    SessionTemplate {
        key: "pattern_deep_dive",
        display_name: "Pattern Deep Dive",
        description: "One pattern, ordered from easy to hard.",
        category: TemplateCategory::Pattern,
        duration_min: 90,
        max_difficulty: DifficultyLevel::Hard,
        max_same_pattern: 6,
        min_quick_wins: 0,
        emphasis: Emphasis::Confidence,
        min_confidence: None,
        max_confidence: None,
        min_days_since_last: None,
        progression: true,
    },
    SessionTemplate {
        key: "weekend_comprehensive",
        display_name: "Weekend Comprehensive",
        description: "A long session over the whole pool, skewed toward harder problems.",
        category: TemplateCategory::Weekend,
        duration_min: 150,
        max_difficulty: DifficultyLevel::Hard,
        max_same_pattern: 3,
        min_quick_wins: 0,
        emphasis: Emphasis::Difficulty,
        min_confidence: None,
        max_confidence: None,
        min_days_since_last: None,
        progression: false,
    },
    SessionTemplate {
        key: "weekend_weak_patterns",
        display_name: "Weekend Weak Patterns",
        description: "A long session focused on low-confidence problems and weak patterns.",
        category: TemplateCategory::Weekend,
        duration_min: 120,
        max_difficulty: DifficultyLevel::Hard,
        max_same_pattern: 5,
        min_quick_wins: 0,
        emphasis: Emphasis::Confidence,
        min_confidence: None,
        max_confidence: None,
        min_days_since_last: None,
        progression: false,
    },
    SessionTemplate {
        key: "challenge_mode",
        display_name: "Challenge Mode",
        description: "Hard problems you have not touched for a few days.",
        category: TemplateCategory::Weekend,
        duration_min: 100,
        max_difficulty: DifficultyLevel::Hard,
        max_same_pattern: 2,
        min_quick_wins: 0,
        emphasis: Emphasis::Difficulty,
        min_confidence: None,
        max_confidence: None,
        min_days_since_last: Some(3),
        progression: false,
    },
];

pub(crate) fn find(key: &str) -> Option<&'static SessionTemplate> {
    TEMPLATES.iter().find(|template| template.key == key)
}

pub(crate) fn by_category(category: TemplateCategory) -> impl Iterator<Item = &'static SessionTemplate> {
    TEMPLATES.iter().filter(move |template| template.category == category)
}
