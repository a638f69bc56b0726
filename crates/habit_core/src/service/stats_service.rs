//! Aggregate statistics across all habits.
//!
//! # Responsibility
//! - Summarize the ledger and streak counters for dashboards.
//! - Produce the daily completion series and the streak ranking.
//!
//! # Invariants
//! - Every figure in one report is read from a single transaction snapshot.
//! - Windows end at the clock's "today" and include it.
//! - Rates are percentages that assume one completion per habit per day.

use crate::clock::Clock;
use crate::model::habit::HabitId;
use crate::repo::ensure_connection_ready;
use crate::repo::error::RepoResult;
use crate::repo::stats_repo::{SqliteStatsRepository, StatsRepository};
use chrono::{Days, NaiveDate};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// Window for `HabitStats::completion_rate`.
pub const COMPLETION_RATE_WINDOW_DAYS: u32 = 7;
/// Default length of the daily completion series.
pub const DEFAULT_SERIES_DAYS: u32 = 30;
const MAX_SERIES_DAYS: u32 = 366;

/// Headline numbers across all habits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitStats {
    pub total_habits: u32,
    pub completed_today: u32,
    pub total_completions: u32,
    pub average_streak: f64,
    pub best_streak: u32,
    /// Percent of possible completions over the last seven days.
    pub completion_rate: f64,
}

/// Completions recorded on one day across all habits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCompletions {
    pub day: NaiveDate,
    pub completions: u32,
    /// Percent of habits completed that day.
    pub rate: f64,
}

/// One habit's position in the streak ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitStreakEntry {
    pub habit_id: HabitId,
    pub name: String,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Summary, daily series, and ranking taken together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub summary: HabitStats,
    pub daily: Vec<DailyCompletions>,
    pub streaks: Vec<HabitStreakEntry>,
}

/// Read-only statistics over one SQLite connection.
pub struct StatsService<'conn, C: Clock> {
    conn: &'conn Connection,
    clock: C,
}

impl<'conn, C: Clock> StatsService<'conn, C> {
    /// Creates the service from a migrated connection and a day source.
    pub fn try_new(conn: &'conn Connection, clock: C) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn, clock })
    }

    /// Headline numbers as of today.
    pub fn summary(&self) -> RepoResult<HabitStats> {
        let today = self.clock.today();
        self.in_snapshot(|stats| summary(stats, today))
    }

    /// One entry per day for the `days` days ending today, oldest first.
    ///
    /// Days without completions are present with a zero count. `days` is
    /// capped at one year.
    pub fn daily_completions(&self, days: u32) -> RepoResult<Vec<DailyCompletions>> {
        let today = self.clock.today();
        self.in_snapshot(|stats| daily_completions(stats, today, days))
    }

    /// Habits ranked by current streak.
    pub fn streak_ranking(&self) -> RepoResult<Vec<HabitStreakEntry>> {
        self.in_snapshot(|stats| streak_ranking(stats))
    }

    /// Everything above, read from one snapshot.
    pub fn report(&self, days: u32) -> RepoResult<StatsReport> {
        let started_at = Instant::now();
        let today = self.clock.today();
        let result = self.in_snapshot(|stats| {
            Ok(StatsReport {
                summary: summary(stats, today)?,
                daily: daily_completions(stats, today, days)?,
                streaks: streak_ranking(stats)?,
            })
        });

        match &result {
            Ok(report) => info!(
                "event=stats_report module=stats status=ok habits={} series_days={} duration_ms={}",
                report.summary.total_habits,
                report.daily.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=stats_report module=stats status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn in_snapshot<T>(
        &self,
        op: impl FnOnce(&SqliteStatsRepository<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let value = op(&SqliteStatsRepository::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }
}

fn summary(stats: &impl StatsRepository, today: NaiveDate) -> RepoResult<HabitStats> {
    let total_habits = stats.habit_count()?;
    let window_start = days_back(today, COMPLETION_RATE_WINDOW_DAYS);
    let completed_in_window = stats.completions_between(window_start, today)?;

    Ok(HabitStats {
        total_habits,
        completed_today: stats.completions_between(today, today)?,
        total_completions: stats.total_completions()?,
        average_streak: stats.average_current_streak()?,
        best_streak: stats.best_longest_streak()?,
        completion_rate: percent(
            completed_in_window,
            u64::from(total_habits) * u64::from(COMPLETION_RATE_WINDOW_DAYS),
        ),
    })
}

fn daily_completions(
    stats: &impl StatsRepository,
    today: NaiveDate,
    days: u32,
) -> RepoResult<Vec<DailyCompletions>> {
    let days = days.min(MAX_SERIES_DAYS);
    if days == 0 {
        return Ok(Vec::new());
    }

    let total_habits = stats.habit_count()?;
    let from = days_back(today, days);
    let counts: HashMap<NaiveDate, u32> = stats
        .daily_completion_counts(from, today)?
        .into_iter()
        .collect();

    Ok(from
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| {
            let completions = counts.get(&day).copied().unwrap_or(0);
            DailyCompletions {
                day,
                completions,
                rate: percent(completions, u64::from(total_habits)),
            }
        })
        .collect())
}

fn streak_ranking(stats: &impl StatsRepository) -> RepoResult<Vec<HabitStreakEntry>> {
    Ok(stats
        .streak_ranking()?
        .into_iter()
        .map(|row| HabitStreakEntry {
            habit_id: row.habit_id,
            name: row.name,
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
        })
        .collect())
}

/// First day of the `days`-long window that ends on `today`.
fn days_back(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

fn percent(part: u32, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    f64::from(part) / whole as f64 * 100.0
}
