use serde::Deserialize;

use crate::services::scoring::ScoringWeights;

/// Partial update; omitted weights keep their current value.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WeightsUpdate {
    #[serde(default)]
    pub(crate) w_conf: Option<f64>,
    #[serde(default)]
    pub(crate) w_days: Option<f64>,
    #[serde(default)]
    pub(crate) w_attempts: Option<f64>,
    #[serde(default)]
    pub(crate) w_time: Option<f64>,
    #[serde(default)]
    pub(crate) w_difficulty: Option<f64>,
    #[serde(default)]
    pub(crate) w_failed: Option<f64>,
    #[serde(default)]
    pub(crate) w_pattern: Option<f64>,
}

impl WeightsUpdate {
    pub(crate) fn merge_into(&self, current: ScoringWeights) -> ScoringWeights {
        ScoringWeights {
            w_conf: self.w_conf.unwrap_or(current.w_conf),
            w_days: self.w_days.unwrap_or(current.w_days),
            w_attempts: self.w_attempts.unwrap_or(current.w_attempts),
            w_time: self.w_time.unwrap_or(current.w_time),
            w_difficulty: self.w_difficulty.unwrap_or(current.w_difficulty),
            w_failed: self.w_failed.unwrap_or(current.w_failed),
            w_pattern: self.w_pattern.unwrap_or(current.w_pattern),
        }
    }
}
