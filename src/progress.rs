//! Progress math for dashboards: percentages and workout streaks.

use chrono::NaiveDate;

/// `done / total` as a whole percentage, capped at 100. Zero when `total` is 0.
pub fn completion_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = done.min(total) * 100 / total;
    percent as u8
}

/// Percentage of the flow reached when standing at `position`.
///
/// Being on the first step counts as one step reached, so the first step of
/// a nine-step flow reports 11.
pub fn flow_progress_percent(position: usize, total_steps: usize) -> u8 {
    completion_percent(position.saturating_add(1), total_steps)
}

/// Share of a weekly workout target already met.
pub fn weekly_goal_percent(completed: u32, target: u32) -> u8 {
    completion_percent(completed as usize, target as usize)
}

fn sorted_unique(days: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut dates = days.to_vec();
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Consecutive workout days ending today or yesterday.
///
/// A streak whose last day is older than yesterday is broken and counts 0.
/// Dates after `today` are ignored.
pub fn current_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let dates: Vec<NaiveDate> = sorted_unique(days)
        .into_iter()
        .filter(|d| *d <= today)
        .collect();

    let Some(last) = dates.last() else {
        return 0;
    };
    if today.signed_duration_since(*last).num_days() > 1 {
        return 0;
    }

    let mut streak = 1u32;
    for pair in dates.windows(2).rev() {
        if pair[1].signed_duration_since(pair[0]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Longest run of consecutive workout days anywhere in `days`.
pub fn longest_streak(days: &[NaiveDate]) -> u32 {
    let dates = sorted_unique(days);
    if dates.is_empty() {
        return 0;
    }

    let mut longest = 1u32;
    let mut streak = 1u32;
    for pair in dates.windows(2) {
        if pair[1].signed_duration_since(pair[0]).num_days() == 1 {
            streak += 1;
            longest = longest.max(streak);
        } else {
            streak = 1;
        }
    }
    longest
}
