//! Turns stored problems and attempt history into scoring candidates.

use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::types::AttemptOutcome;
use crate::repositories;
use crate::repositories::attempts::AttemptHistoryRow;
use crate::repositories::patterns::PatternStatsRow;
use crate::repositories::problems::ProblemStatsRow;
use crate::services::scoring::{self, Recency, ReviewSchedule, UrgencySignals};
use crate::services::session_generator::Candidate;

pub(crate) async fn load(
    pool: &PgPool,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<Vec<Candidate>, sqlx::Error> {
    let problems = repositories::problems::list_all_with_stats(pool, user_id).await?;
    let patterns = repositories::patterns::list_visible_with_stats(pool, user_id).await?;
    let history = repositories::attempts::history_for_user(pool, user_id).await?;

    Ok(build(problems, &patterns, history, now))
}

pub(crate) fn build(
    problems: Vec<ProblemStatsRow>,
    patterns: &[PatternStatsRow],
    history: Vec<AttemptHistoryRow>,
    now: PrimitiveDateTime,
) -> Vec<Candidate> {
    let pattern_avgs: HashMap<&str, Option<f64>> =
        patterns.iter().map(|pattern| (pattern.id.as_str(), pattern.avg_confidence)).collect();

    let mut histories: HashMap<String, Vec<(AttemptOutcome, i32)>> = HashMap::new();
    for row in history {
        histories.entry(row.problem_id).or_default().push((row.outcome, row.confidence_score));
    }

    problems
        .into_iter()
        .map(|problem| {
            let schedule = histories
                .get(&problem.id)
                .and_then(|entries| ReviewSchedule::replay(entries.iter().copied()));
            let linked: Vec<Option<f64>> = problem
                .pattern_ids
                .iter()
                .map(|id| pattern_avgs.get(id.as_str()).copied().flatten())
                .collect();

            Candidate {
                signals: UrgencySignals {
                    total_attempts: u32::try_from(problem.total_attempts).unwrap_or(u32::MAX),
                    avg_confidence: problem.avg_confidence,
                    last_failed: problem.last_outcome == Some(AttemptOutcome::Failed),
                    avg_time_seconds: problem.avg_duration_seconds,
                    pattern_weakness: scoring::pattern_weakness(&linked),
                    review_interval_days: schedule.map(|schedule| schedule.interval_days),
                },
                recency: Recency::since(problem.last_attempt_at, now),
                confidence: problem.latest_confidence,
                problem_id: problem.id,
                title: problem.title,
                source: problem.source,
                difficulty: problem.difficulty,
                pattern_ids: problem.pattern_ids,
            }
        })
        .collect()
}
