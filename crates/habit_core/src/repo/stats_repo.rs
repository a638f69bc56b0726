//! Aggregate read queries over the ledger and streak tables.
//!
//! # Invariants
//! - Read-only; nothing here mutates habits, completions, or counters.
//! - Day windows are inclusive on both ends and compare ISO day text, which
//!   sorts the same as the dates themselves.

use crate::model::completion::{format_day, parse_day};
use crate::model::habit::HabitId;
use crate::repo::ensure_connection_ready;
use crate::repo::error::{RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// One row of the per-habit streak ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakRankRow {
    pub habit_id: HabitId,
    pub name: String,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Aggregate queries used by statistics views.
pub trait StatsRepository {
    fn habit_count(&self) -> RepoResult<u32>;
    fn total_completions(&self) -> RepoResult<u32>;
    /// Completions of any habit with `from <= day <= to`.
    fn completions_between(&self, from: NaiveDate, to: NaiveDate) -> RepoResult<u32>;
    /// Per-day completion counts in `from..=to`, ascending; empty days are absent.
    fn daily_completion_counts(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<(NaiveDate, u32)>>;
    /// Mean `current_streak` over all streak rows, 0 when there are none.
    fn average_current_streak(&self) -> RepoResult<f64>;
    /// Highest `longest_streak` over all streak rows, 0 when there are none.
    fn best_longest_streak(&self) -> RepoResult<u32>;
    /// Habits ordered by current streak (desc), then name and id.
    fn streak_ranking(&self) -> RepoResult<Vec<StreakRankRow>>;
}

/// SQLite-backed aggregate queries.
pub struct SqliteStatsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStatsRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<u32> {
        let value: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        counter(value, "count")
    }
}

impl StatsRepository for SqliteStatsRepository<'_> {
    fn habit_count(&self) -> RepoResult<u32> {
        self.count("SELECT COUNT(*) FROM habits;", [])
    }

    fn total_completions(&self) -> RepoResult<u32> {
        self.count("SELECT COUNT(*) FROM habit_completions;", [])
    }

    fn completions_between(&self, from: NaiveDate, to: NaiveDate) -> RepoResult<u32> {
        self.count(
            "SELECT COUNT(*)
             FROM habit_completions
             WHERE completed_on BETWEEN ?1 AND ?2;",
            params![format_day(from), format_day(to)],
        )
    }

    fn daily_completion_counts(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<(NaiveDate, u32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT completed_on, COUNT(*)
             FROM habit_completions
             WHERE completed_on BETWEEN ?1 AND ?2
             GROUP BY completed_on
             ORDER BY completed_on ASC;",
        )?;
        let mut rows = stmt.query(params![format_day(from), format_day(to)])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let day_text: String = row.get(0)?;
            let day = parse_day(&day_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid day `{day_text}` in habit_completions.completed_on"
                ))
            })?;
            counts.push((day, counter(row.get(1)?, "count")?));
        }
        Ok(counts)
    }

    fn average_current_streak(&self) -> RepoResult<f64> {
        let average: f64 = self.conn.query_row(
            "SELECT COALESCE(AVG(current_streak), 0.0) FROM habit_streaks;",
            [],
            |row| row.get(0),
        )?;
        Ok(average)
    }

    fn best_longest_streak(&self) -> RepoResult<u32> {
        self.count(
            "SELECT COALESCE(MAX(longest_streak), 0) FROM habit_streaks;",
            [],
        )
    }

    fn streak_ranking(&self) -> RepoResult<Vec<StreakRankRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                h.uuid,
                h.name,
                COALESCE(s.current_streak, 0),
                COALESCE(s.longest_streak, 0)
             FROM habits h
             LEFT JOIN habit_streaks s ON s.habit_uuid = h.uuid
             ORDER BY 3 DESC, h.name ASC, h.uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut ranking = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get(0)?;
            let habit_id = Uuid::parse_str(&uuid_text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in habits.uuid"))
            })?;
            ranking.push(StreakRankRow {
                habit_id,
                name: row.get(1)?,
                current_streak: counter(row.get(2)?, "current_streak")?,
                longest_streak: counter(row.get(3)?, "longest_streak")?,
            });
        }
        Ok(ranking)
    }
}

fn counter(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid {column} value `{value}`")))
}
