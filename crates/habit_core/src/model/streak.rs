//! Streak state and its pure transitions.
//!
//! # Responsibility
//! - Define the per-habit derived counters (`current`, `longest`, last day).
//! - Compute the next state for completion and retraction events.
//! - Derive run lengths from an ascending completion history.
//!
//! # Invariants
//! - `current_streak <= longest_streak` after every transition.
//! - Transitions never touch storage; the engine persists their results.

use crate::model::habit::HabitId;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a completion after a missed day affects the current streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPolicy {
    /// Every completion extends the current streak, even after missed days.
    #[default]
    ContinueAcrossGaps,
    /// A completion not preceded by one on the previous day restarts at 1.
    ResetOnGap,
}

impl StreakPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContinueAcrossGaps => "continue",
            Self::ResetOnGap => "reset",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "continue" | "continue_across_gaps" => Some(Self::ContinueAcrossGaps),
            "reset" | "reset_on_gap" => Some(Self::ResetOnGap),
            _ => None,
        }
    }
}

/// Derived streak counters for one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub habit_id: HabitId,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Serialized as ISO `YYYY-MM-DD`.
    pub last_completion_day: Option<NaiveDate>,
}

/// Result of applying a retraction to a streak state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retraction {
    pub state: StreakState,
    /// Set when the shortened streak was the record holder, so `longest`
    /// must be recomputed from the remaining history.
    pub recompute_longest: bool,
}

impl StreakState {
    /// Zeroed state allocated when a habit is created.
    pub fn zeroed(habit_id: HabitId) -> Self {
        Self {
            habit_id,
            current_streak: 0,
            longest_streak: 0,
            last_completion_day: None,
        }
    }

    /// Next state after recording a completion on `today`.
    ///
    /// Callers must already have rejected a duplicate completion for `today`.
    pub fn after_completion(&self, today: NaiveDate, policy: StreakPolicy) -> Self {
        let extends = match policy {
            StreakPolicy::ContinueAcrossGaps => true,
            StreakPolicy::ResetOnGap => self
                .last_completion_day
                .is_some_and(|last| last.succ_opt() == Some(today)),
        };
        let current_streak = if extends {
            self.current_streak.saturating_add(1)
        } else {
            1
        };

        Self {
            habit_id: self.habit_id,
            current_streak,
            longest_streak: self.longest_streak.max(current_streak),
            last_completion_day: Some(today),
        }
    }

    /// Next state after retracting today's completion.
    ///
    /// `previous_completion` is the latest completion left in the ledger
    /// before the retracted day.
    pub fn after_retraction(&self, previous_completion: Option<NaiveDate>) -> Retraction {
        let recompute_longest =
            self.current_streak > 0 && self.current_streak == self.longest_streak;
        Retraction {
            state: Self {
                habit_id: self.habit_id,
                current_streak: self.current_streak.saturating_sub(1),
                longest_streak: self.longest_streak,
                last_completion_day: previous_completion,
            },
            recompute_longest,
        }
    }

    /// Replaces `longest` with a value recomputed from history.
    ///
    /// Returns `true` when the recomputed value was below `current` and had
    /// to be raised to keep `current <= longest`.
    pub fn apply_recomputed_longest(&mut self, recomputed: u32) -> bool {
        if recomputed < self.current_streak {
            self.longest_streak = self.current_streak;
            return true;
        }
        self.longest_streak = recomputed;
        false
    }

    /// Returns whether the counters satisfy `current <= longest`.
    pub fn is_consistent(&self) -> bool {
        self.current_streak <= self.longest_streak
    }
}

/// Length of the longest run of consecutive days in an ascending history.
///
/// Each day is bucketed by its run anchor `day - rank`, where `rank` is the
/// day's position among distinct days; consecutive days share an anchor, so
/// the largest bucket is the longest run. Returns 0 for an empty history.
pub fn longest_run<I>(days: I) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut buckets: HashMap<i64, u32> = HashMap::new();
    for (rank, day) in distinct_ascending(days).enumerate() {
        let anchor = i64::from(day.num_days_from_ce()) - rank as i64;
        *buckets.entry(anchor).or_insert(0) += 1;
    }
    buckets.into_values().max().unwrap_or(0)
}

/// Length of the run that ends at the latest day of an ascending history.
pub fn trailing_run<I>(days: I) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in distinct_ascending(days) {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        previous = Some(day);
    }
    run
}

fn distinct_ascending<I>(days: I) -> impl Iterator<Item = NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut last: Option<NaiveDate> = None;
    days.into_iter().filter(move |day| {
        if last == Some(*day) {
            return false;
        }
        last = Some(*day);
        true
    })
}

#[cfg(test)]
mod tests {
    use super::{longest_run, trailing_run, StreakPolicy, StreakState};
    use chrono::{Days, NaiveDate};
    use uuid::Uuid;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 27)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    }

    #[test]
    fn longest_run_of_empty_history_is_zero() {
        assert_eq!(longest_run(Vec::new()), 0);
        assert_eq!(trailing_run(Vec::new()), 0);
    }

    #[test]
    fn longest_run_picks_largest_bucket() {
        let history = vec![day(0), day(1), day(2), day(5), day(6)];
        assert_eq!(longest_run(history.clone()), 3);
        assert_eq!(trailing_run(history), 2);
    }

    #[test]
    fn runs_cross_month_and_leap_day_boundaries() {
        // 2024-02-27 .. 2024-03-02 spans Feb 29.
        let history: Vec<_> = (0..5).map(day).collect();
        assert_eq!(longest_run(history.clone()), 5);
        assert_eq!(trailing_run(history), 5);
    }

    #[test]
    fn duplicate_days_count_once() {
        let history = vec![day(0), day(0), day(1), day(3)];
        assert_eq!(longest_run(history), 2);
    }

    #[test]
    fn completion_continues_across_gaps_by_default() {
        let state = StreakState::zeroed(Uuid::new_v4())
            .after_completion(day(0), StreakPolicy::default())
            .after_completion(day(4), StreakPolicy::default());
        assert_eq!(state.current_streak, 2);
        assert_eq!(state.longest_streak, 2);
        assert_eq!(state.last_completion_day, Some(day(4)));
    }

    #[test]
    fn completion_resets_after_gap_when_configured() {
        let policy = StreakPolicy::ResetOnGap;
        let state = StreakState::zeroed(Uuid::new_v4())
            .after_completion(day(0), policy)
            .after_completion(day(1), policy)
            .after_completion(day(4), policy);
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 2);
    }

    #[test]
    fn retraction_flags_recompute_only_for_record_holder() {
        let mut state = StreakState::zeroed(Uuid::new_v4());
        state.current_streak = 2;
        state.longest_streak = 5;
        let retraction = state.after_retraction(Some(day(1)));
        assert!(!retraction.recompute_longest);
        assert_eq!(retraction.state.current_streak, 1);
        assert_eq!(retraction.state.longest_streak, 5);

        state.current_streak = 5;
        assert!(state.after_retraction(None).recompute_longest);

        let zeroed = StreakState::zeroed(state.habit_id);
        let retraction = zeroed.after_retraction(None);
        assert!(!retraction.recompute_longest);
        assert_eq!(retraction.state.current_streak, 0);
    }

    #[test]
    fn recomputed_longest_never_drops_below_current() {
        let mut state = StreakState::zeroed(Uuid::new_v4());
        state.current_streak = 2;
        state.longest_streak = 3;
        assert!(state.apply_recomputed_longest(1));
        assert_eq!(state.longest_streak, 2);
        assert!(!state.apply_recomputed_longest(4));
        assert_eq!(state.longest_streak, 4);
    }

    #[test]
    fn policy_parse_accepts_short_and_long_names() {
        assert_eq!(StreakPolicy::parse("Reset"), Some(StreakPolicy::ResetOnGap));
        assert_eq!(
            StreakPolicy::parse("continue_across_gaps"),
            Some(StreakPolicy::ContinueAcrossGaps)
        );
        assert_eq!(StreakPolicy::parse("sometimes"), None);
    }
}
