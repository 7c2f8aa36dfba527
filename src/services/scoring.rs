//! Urgency scoring: a weighted sum of per-problem features in `[0, 1]`.
//!
//! Every feature is non-increasing in confidence and non-decreasing in days
//! since the last attempt, and weights are non-negative, so the final score
//! keeps both properties.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::core::time::days_between;
use crate::db::types::{AttemptOutcome, DifficultyLevel};

pub(crate) const DEFAULT_CONFIDENCE: i32 = 50;

const NEVER_ATTEMPTED_RECENCY: f64 = 0.8;
const RECENCY_CAP_DAYS: f64 = 90.0;
const ATTEMPT_CAP: f64 = 10.0;
const SOLVE_TIME_CAP_SECONDS: f64 = 3600.0;
const PATTERN_FALLBACK_WEAKNESS: f64 = 0.5;
const SIGNIFICANT_CONTRIBUTION: f64 = 0.01;
const REASON_PARTS: usize = 3;

const SM2_INITIAL_EASE: f64 = 2.5;
const SM2_MIN_EASE: f64 = 1.3;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ScoringError {
    #[error("weight {key} must be between 0 and 1, got {value}")]
    WeightOutOfRange { key: &'static str, value: f64 },
    #[error("at least one weight must be positive")]
    AllWeightsZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoringWeights {
    pub(crate) w_conf: f64,
    pub(crate) w_days: f64,
    pub(crate) w_attempts: f64,
    pub(crate) w_time: f64,
    pub(crate) w_difficulty: f64,
    pub(crate) w_failed: f64,
    pub(crate) w_pattern: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            w_conf: 0.30,
            w_days: 0.20,
            w_attempts: 0.10,
            w_time: 0.05,
            w_difficulty: 0.15,
            w_failed: 0.10,
            w_pattern: 0.10,
        }
    }
}

impl ScoringWeights {
    pub(crate) fn entries(&self) -> [(&'static str, f64); 7] {
        [
            ("w_conf", self.w_conf),
            ("w_days", self.w_days),
            ("w_attempts", self.w_attempts),
            ("w_time", self.w_time),
            ("w_difficulty", self.w_difficulty),
            ("w_failed", self.w_failed),
            ("w_pattern", self.w_pattern),
        ]
    }

    /// Applies a stored `key=value` pair. Unknown keys are ignored.
    pub(crate) fn apply(&mut self, key: &str, value: f64) {
        let slot = match key {
            "w_conf" => &mut self.w_conf,
            "w_days" => &mut self.w_days,
            "w_attempts" => &mut self.w_attempts,
            "w_time" => &mut self.w_time,
            "w_difficulty" => &mut self.w_difficulty,
            "w_failed" => &mut self.w_failed,
            "w_pattern" => &mut self.w_pattern,
            _ => return,
        };
        *slot = value;
    }

    pub(crate) fn total(&self) -> f64 {
        self.entries().iter().map(|(_, value)| value).sum()
    }

    pub(crate) fn validate(&self) -> Result<(), ScoringError> {
        for (key, value) in self.entries() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScoringError::WeightOutOfRange { key, value });
            }
        }
        if self.total() <= 0.0 {
            return Err(ScoringError::AllWeightsZero);
        }
        Ok(())
    }

    pub(crate) fn with_emphasis(&self, emphasis: Emphasis) -> Self {
        let mut weights = *self;
        match emphasis {
            Emphasis::Standard => return weights,
            Emphasis::Confidence => weights.w_conf *= 2.0,
            Emphasis::Failure => weights.w_failed *= 2.0,
            Emphasis::Time => weights.w_time *= 3.0,
            Emphasis::Difficulty => weights.w_difficulty *= 2.0,
        }

        let total = weights.total();
        if total > 0.0 {
            weights.w_conf /= total;
            weights.w_days /= total;
            weights.w_attempts /= total;
            weights.w_time /= total;
            weights.w_difficulty /= total;
            weights.w_failed /= total;
            weights.w_pattern /= total;
        }
        weights
    }
}

/// Which feature a template boosts before the weights are renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Emphasis {
    Standard,
    Confidence,
    Failure,
    Time,
    Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Recency {
    Never,
    DaysAgo(f64),
}

impl Recency {
    /// A missing timestamp is the never-attempted branch, not a zero or NaN distance.
    pub(crate) fn since(last_attempt_at: Option<PrimitiveDateTime>, now: PrimitiveDateTime) -> Self {
        match last_attempt_at {
            None => Self::Never,
            Some(last) => Self::DaysAgo(days_between(last, now).max(0.0)),
        }
    }

    pub(crate) fn whole_days(self) -> Option<i64> {
        match self {
            Self::Never => None,
            Self::DaysAgo(days) => Some(days.floor() as i64),
        }
    }
}

/// SM-2 spaced-repetition state, rebuilt from attempt history on read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ReviewSchedule {
    pub(crate) interval_days: i32,
    pub(crate) ease_factor: f64,
    pub(crate) review_count: i32,
}

impl Default for ReviewSchedule {
    fn default() -> Self {
        Self { interval_days: 0, ease_factor: SM2_INITIAL_EASE, review_count: 0 }
    }
}

impl ReviewSchedule {
    pub(crate) fn replay<I>(history: I) -> Option<Self>
    where
        I: IntoIterator<Item = (AttemptOutcome, i32)>,
    {
        history.into_iter().fold(None, |schedule: Option<Self>, (outcome, confidence)| {
            Some(schedule.unwrap_or_default().next(outcome, confidence))
        })
    }

    pub(crate) fn next(self, outcome: AttemptOutcome, confidence: i32) -> Self {
        let quality = f64::from(sm2_quality(outcome, confidence));

        let (interval_days, ease_factor) = if quality >= 3.0 {
            let interval = match self.review_count {
                0 => 1,
                1 => 6,
                _ => (f64::from(self.interval_days.max(1)) * self.ease_factor).round() as i32,
            };
            let ease = self.ease_factor + (0.1 - (5.0 - quality) * (0.08 + (5.0 - quality) * 0.02));
            (interval, ease.max(SM2_MIN_EASE))
        } else {
            (1, (self.ease_factor - 0.2).max(SM2_MIN_EASE))
        };

        Self { interval_days, ease_factor, review_count: self.review_count + 1 }
    }

    pub(crate) fn next_review_at(&self, last_attempt_at: PrimitiveDateTime) -> PrimitiveDateTime {
        last_attempt_at + time::Duration::days(i64::from(self.interval_days))
    }
}

pub(crate) fn sm2_quality(outcome: AttemptOutcome, confidence: i32) -> u8 {
    if outcome == AttemptOutcome::Failed {
        return 0;
    }
    match confidence {
        c if c >= 80 => 5,
        c if c >= 60 => 4,
        c if c >= 40 => 3,
        c if c >= 20 => 2,
        _ => 1,
    }
}

/// History-derived signals beyond the three primary inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct UrgencySignals {
    pub(crate) total_attempts: u32,
    pub(crate) avg_confidence: Option<f64>,
    pub(crate) last_failed: bool,
    pub(crate) avg_time_seconds: Option<f64>,
    pub(crate) pattern_weakness: Option<f64>,
    pub(crate) review_interval_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UrgencyInput {
    pub(crate) confidence: Option<i32>,
    pub(crate) recency: Recency,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) signals: UrgencySignals,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FeatureBreakdown {
    pub(crate) f_conf: f64,
    pub(crate) f_days: f64,
    pub(crate) f_attempts: f64,
    pub(crate) f_time: f64,
    pub(crate) f_difficulty: f64,
    pub(crate) f_failed: f64,
    pub(crate) f_pattern: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Urgency {
    pub(crate) score: f64,
    pub(crate) features: FeatureBreakdown,
    pub(crate) reason: String,
}

pub(crate) fn features(input: &UrgencyInput) -> FeatureBreakdown {
    let confidence = f64::from(input.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0, 100));
    let signals = &input.signals;

    FeatureBreakdown {
        f_conf: (100.0 - confidence) / 100.0,
        f_days: recency_feature(input.recency, signals),
        f_attempts: 1.0 - f64::from(signals.total_attempts).min(ATTEMPT_CAP) / ATTEMPT_CAP,
        f_time: signals
            .avg_time_seconds
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(|seconds| seconds.min(SOLVE_TIME_CAP_SECONDS) / SOLVE_TIME_CAP_SECONDS)
            .unwrap_or(0.0),
        f_difficulty: match input.difficulty {
            DifficultyLevel::Easy => 0.2,
            DifficultyLevel::Medium => 0.5,
            DifficultyLevel::Hard => 1.0,
        },
        f_failed: if signals.last_failed { 1.0 } else { 0.0 },
        f_pattern: signals
            .pattern_weakness
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(PATTERN_FALLBACK_WEAKNESS),
    }
}

fn recency_feature(recency: Recency, signals: &UrgencySignals) -> f64 {
    let days = match recency {
        Recency::Never => return NEVER_ATTEMPTED_RECENCY,
        Recency::DaysAgo(days) if days.is_finite() => days.max(0.0),
        Recency::DaysAgo(_) => return NEVER_ATTEMPTED_RECENCY,
    };

    if let Some(interval) = signals.review_interval_days {
        let overdue = days - f64::from(interval);
        return if overdue > 0.0 {
            (0.5 + 0.5 * (1.0 - (-overdue / 7.0).exp())).min(1.0)
        } else {
            (0.5 * (1.0 + overdue / 30.0)).max(0.0)
        };
    }

    let cap = RECENCY_CAP_DAYS * mastery_multiplier(signals);
    days.min(cap) / cap
}

fn mastery_multiplier(signals: &UrgencySignals) -> f64 {
    let avg = signals.avg_confidence.unwrap_or(f64::from(DEFAULT_CONFIDENCE));
    if signals.total_attempts > 3 && avg > 90.0 {
        4.0
    } else if signals.total_attempts > 1 && avg > 80.0 {
        2.0
    } else {
        1.0
    }
}

/// Mean of `1 - avg/100` over linked patterns; patterns without stats count as 0.5.
pub(crate) fn pattern_weakness(pattern_avg_confidences: &[Option<f64>]) -> Option<f64> {
    if pattern_avg_confidences.is_empty() {
        return None;
    }
    let total: f64 = pattern_avg_confidences
        .iter()
        .map(|avg| avg.map(|value| 1.0 - value / 100.0).unwrap_or(PATTERN_FALLBACK_WEAKNESS))
        .sum();
    Some(total / pattern_avg_confidences.len() as f64)
}

pub(crate) fn urgency_score(input: &UrgencyInput, weights: &ScoringWeights) -> f64 {
    weighted(&features(input), weights)
        .iter()
        .map(|(_, contribution)| contribution)
        .sum()
}

pub(crate) fn evaluate(input: &UrgencyInput, weights: &ScoringWeights) -> Urgency {
    let features = features(input);
    let contributions = weighted(&features, weights);
    let score = contributions.iter().map(|(_, contribution)| contribution).sum();
    Urgency { score, features, reason: build_reason(input, &contributions) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Confidence,
    Days,
    Attempts,
    Time,
    Difficulty,
    Failed,
    Pattern,
}

fn weighted(features: &FeatureBreakdown, weights: &ScoringWeights) -> [(Feature, f64); 7] {
    [
        (Feature::Confidence, weights.w_conf * features.f_conf),
        (Feature::Days, weights.w_days * features.f_days),
        (Feature::Attempts, weights.w_attempts * features.f_attempts),
        (Feature::Time, weights.w_time * features.f_time),
        (Feature::Difficulty, weights.w_difficulty * features.f_difficulty),
        (Feature::Failed, weights.w_failed * features.f_failed),
        (Feature::Pattern, weights.w_pattern * features.f_pattern),
    ]
}

fn build_reason(input: &UrgencyInput, contributions: &[(Feature, f64)]) -> String {
    let mut ranked = contributions.to_vec();
    ranked.sort_by(|left, right| right.1.total_cmp(&left.1));

    let parts: Vec<String> = ranked
        .into_iter()
        .filter(|(_, contribution)| *contribution > SIGNIFICANT_CONTRIBUTION)
        .take(REASON_PARTS)
        .map(|(feature, _)| describe(feature, input))
        .collect();

    if parts.is_empty() {
        "needs review".to_string()
    } else {
        parts.join(", ")
    }
}

fn describe(feature: Feature, input: &UrgencyInput) -> String {
    let signals = &input.signals;
    match feature {
        Feature::Confidence => match input.confidence {
            Some(confidence) => format!("confidence {confidence}%"),
            None => "no confidence yet".to_string(),
        },
        Feature::Days => match (input.recency, signals.review_interval_days) {
            (Recency::Never, _) => "never attempted".to_string(),
            (Recency::DaysAgo(days), Some(interval)) => {
                let overdue = (days - f64::from(interval)).trunc() as i64;
                match overdue {
                    0 => "due today".to_string(),
                    n if n > 0 => format!("{n} days overdue"),
                    n => format!("due in {} days", -n),
                }
            }
            (Recency::DaysAgo(days), None) => format!("{} days since last", days.floor() as i64),
        },
        Feature::Attempts => match signals.total_attempts {
            0 => "no attempts yet".to_string(),
            n if n < 3 => format!("only {n} attempts"),
            _ => "needs practice".to_string(),
        },
        Feature::Time => "long solve time".to_string(),
        Feature::Difficulty => match input.difficulty {
            DifficultyLevel::Hard => "high difficulty".to_string(),
            other => format!("{} difficulty", other.as_str()),
        },
        Feature::Failed => "failed last attempt".to_string(),
        Feature::Pattern => "weak pattern".to_string(),
    }
}
