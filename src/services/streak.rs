use std::collections::HashSet;

use time::{Date, Duration};

/// Consecutive practice days ending today, or yesterday when today has no attempt yet.
pub(crate) fn current_streak(practice_days: &[Date], today: Date) -> u32 {
    let days: HashSet<Date> = practice_days.iter().copied().collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.checked_sub(Duration::days(1)) {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.checked_sub(Duration::days(1)) {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    streak
}
