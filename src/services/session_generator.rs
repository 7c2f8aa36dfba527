//! Builds an ordered practice playlist from a template and the caller's problems.
//!
//! Pure: callers load candidates and weights, this module only filters, ranks
//! and packs them into the time budget.

use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;

use crate::core::config::PracticeSettings;
use crate::db::types::DifficultyLevel;
use crate::services::scoring::{
    self, Recency, ScoringWeights, UrgencyInput, UrgencySignals, DEFAULT_CONFIDENCE,
};
use crate::services::templates::{SessionTemplate, QUICK_WIN_MAX_MIN};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum GenerationError {
    #[error("Template '{template}' requires a pattern_id")]
    PatternRequired { template: &'static str },
    #[error("No eligible problems for template '{template}'; add problems or relax the filters")]
    NoEligibleProblems { template: &'static str },
    #[error(
        "A {duration_min}-minute budget is too small; the shortest eligible problem needs {smallest_min} minutes"
    )]
    BudgetTooSmall { duration_min: u32, smallest_min: u32 },
    #[error(
        "Not enough quick wins: need at least {required} problems planned at {max_min} minutes or less, found {available}; add more easy problems"
    )]
    NotEnoughQuickWins { required: u32, available: u32, max_min: u32 },
}

impl GenerationError {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::PatternRequired { .. } => "pattern_required",
            Self::NoEligibleProblems { .. } => "no_eligible_problems",
            Self::BudgetTooSmall { .. } => "budget_too_small",
            Self::NotEnoughQuickWins { .. } => "not_enough_quick_wins",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) problem_id: String,
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) pattern_ids: Vec<String>,
    pub(crate) confidence: Option<i32>,
    pub(crate) recency: Recency,
    pub(crate) signals: UrgencySignals,
}

impl Candidate {
    pub(crate) fn urgency_input(&self) -> UrgencyInput {
        UrgencyInput {
            confidence: self.confidence,
            recency: self.recency,
            difficulty: self.difficulty,
            signals: self.signals.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RankedCandidate {
    pub(crate) candidate: Candidate,
    pub(crate) score: f64,
    pub(crate) reason: String,
}

#[derive(Debug, Clone)]
pub(crate) struct GenerationRequest<'a> {
    pub(crate) template: &'static SessionTemplate,
    pub(crate) duration_min: Option<u32>,
    pub(crate) pattern_id: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedProblem {
    pub(crate) problem_id: String,
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) planned_min: u32,
    pub(crate) score: f64,
    pub(crate) days_since_last: Option<i64>,
    pub(crate) confidence: Option<i32>,
    pub(crate) reason: String,
    pub(crate) order_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GeneratedSession {
    pub(crate) template: &'static SessionTemplate,
    pub(crate) planned_duration_min: u32,
    pub(crate) total_planned_min: u32,
    pub(crate) problems: Vec<PlannedProblem>,
}

/// Scores every candidate and sorts most urgent first.
///
/// Ties fall back to least recently attempted (never attempted first), then
/// problem id, so the same inputs always produce the same order.
pub(crate) fn rank(candidates: Vec<Candidate>, weights: &ScoringWeights) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let urgency = scoring::evaluate(&candidate.urgency_input(), weights);
            RankedCandidate { candidate, score: urgency.score, reason: urgency.reason }
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| staleness_order(left.candidate.recency, right.candidate.recency))
            .then_with(|| left.candidate.problem_id.cmp(&right.candidate.problem_id))
    });
    ranked
}

fn staleness_order(left: Recency, right: Recency) -> Ordering {
    match (left, right) {
        (Recency::Never, Recency::Never) => Ordering::Equal,
        (Recency::Never, Recency::DaysAgo(_)) => Ordering::Less,
        (Recency::DaysAgo(_), Recency::Never) => Ordering::Greater,
        (Recency::DaysAgo(left), Recency::DaysAgo(right)) => right.total_cmp(&left),
    }
}

pub(crate) fn generate(
    request: &GenerationRequest<'_>,
    candidates: Vec<Candidate>,
    weights: &ScoringWeights,
    practice: &PracticeSettings,
) -> Result<GeneratedSession, GenerationError> {
    let template = request.template;
    if template.requires_pattern() && request.pattern_id.is_none() {
        return Err(GenerationError::PatternRequired { template: template.key });
    }

    let budget = request.duration_min.unwrap_or(template.duration_min);

    let eligible: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| is_eligible(template, request.pattern_id, candidate))
        .collect();
    if eligible.is_empty() {
        return Err(GenerationError::NoEligibleProblems { template: template.key });
    }

    let smallest_min = eligible
        .iter()
        .map(|candidate| practice.planned_minutes(candidate.difficulty))
        .min()
        .unwrap_or_default();

    let ranked = rank(eligible, &weights.with_emphasis(template.emphasis));

    let mut selected: Vec<PlannedProblem> = Vec::new();
    let mut per_pattern: HashMap<String, u32> = HashMap::new();
    let mut total = 0u32;

    for item in ranked {
        let candidate = item.candidate;
        let saturated = candidate
            .pattern_ids
            .iter()
            .any(|pattern| per_pattern.get(pattern).copied().unwrap_or(0) >= template.max_same_pattern);
        if saturated {
            continue;
        }

        let planned_min = practice.planned_minutes(candidate.difficulty);
        if total + planned_min > budget {
            break;
        }

        for pattern in &candidate.pattern_ids {
            *per_pattern.entry(pattern.clone()).or_insert(0) += 1;
        }
        total += planned_min;

        selected.push(PlannedProblem {
            days_since_last: candidate.recency.whole_days(),
            problem_id: candidate.problem_id,
            title: candidate.title,
            source: candidate.source,
            difficulty: candidate.difficulty,
            planned_min,
            score: item.score,
            confidence: candidate.confidence,
            reason: item.reason,
            order_index: 0,
        });
    }

    if selected.is_empty() {
        return Err(GenerationError::BudgetTooSmall { duration_min: budget, smallest_min });
    }

    let quick_wins =
        selected.iter().filter(|problem| problem.planned_min <= QUICK_WIN_MAX_MIN).count() as u32;
    if quick_wins < template.min_quick_wins {
        return Err(GenerationError::NotEnoughQuickWins {
            required: template.min_quick_wins,
            available: quick_wins,
            max_min: QUICK_WIN_MAX_MIN,
        });
    }

    if template.progression {
        selected.sort_by_key(|problem| problem.difficulty);
    }
    for (index, problem) in selected.iter_mut().enumerate() {
        problem.order_index = index;
    }

    Ok(GeneratedSession {
        template,
        planned_duration_min: budget,
        total_planned_min: total,
        problems: selected,
    })
}

fn is_eligible(
    template: &SessionTemplate,
    pattern_id: Option<&str>,
    candidate: &Candidate,
) -> bool {
    if candidate.difficulty > template.max_difficulty {
        return false;
    }

    if let Some(pattern_id) = pattern_id {
        if !candidate.pattern_ids.iter().any(|id| id == pattern_id) {
            return false;
        }
    }

    let confidence = candidate.confidence.unwrap_or(DEFAULT_CONFIDENCE);
    if template.min_confidence.is_some_and(|min| confidence < min) {
        return false;
    }
    if template.max_confidence.is_some_and(|max| confidence > max) {
        return false;
    }

    match (template.min_days_since_last, candidate.recency) {
        (Some(min_days), Recency::DaysAgo(days)) => days >= f64::from(min_days),
        _ => true,
    }
}
