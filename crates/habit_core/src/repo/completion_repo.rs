//! Completion ledger contracts and SQLite implementation.
//!
//! # Responsibility
//! - Record and retract (habit, day) completion events.
//! - Serve existence checks and the ascending history used for recomputation.
//!
//! # Invariants
//! - At most one row per (habit, day), enforced by a unique constraint.
//! - Retracting an absent day is a no-op, not an error.
//! - History is returned strictly ascending by day.

use crate::model::completion::{format_day, parse_day, CompletionEvent};
use crate::model::habit::HabitId;
use crate::repo::ensure_connection_ready;
use crate::repo::error::{RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{ffi, params, Connection, OptionalExtension};

/// Append-only ledger of habit completion events.
pub trait CompletionLedger {
    /// Returns whether an event exists for exactly this (habit, day).
    fn has_completion(&self, habit_id: HabitId, day: NaiveDate) -> RepoResult<bool>;
    /// Inserts an event. Fails with `AlreadyCompleted` on a duplicate day.
    fn record_completion(&self, habit_id: HabitId, day: NaiveDate) -> RepoResult<CompletionEvent>;
    /// Deletes the event for (habit, day). Returns whether a row was removed.
    fn retract_completion(&self, habit_id: HabitId, day: NaiveDate) -> RepoResult<bool>;
    /// Returns every completion day for the habit, ascending.
    fn history(&self, habit_id: HabitId) -> RepoResult<Vec<NaiveDate>>;
    /// Returns the latest completion strictly before `day`.
    fn latest_completion_before(
        &self,
        habit_id: HabitId,
        day: NaiveDate,
    ) -> RepoResult<Option<NaiveDate>>;
    /// Counts all completion events for the habit.
    fn completion_count(&self, habit_id: HabitId) -> RepoResult<u32>;
}

/// SQLite-backed completion ledger.
pub struct SqliteCompletionLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCompletionLedger<'conn> {
    /// Creates ledger from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by the caller (e.g. inside a transaction).
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CompletionLedger for SqliteCompletionLedger<'_> {
    fn has_completion(&self, habit_id: HabitId, day: NaiveDate) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM habit_completions
                WHERE habit_uuid = ?1 AND completed_on = ?2
            );",
            params![habit_id.to_string(), format_day(day)],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn record_completion(&self, habit_id: HabitId, day: NaiveDate) -> RepoResult<CompletionEvent> {
        let event = CompletionEvent::new(habit_id, day);
        let inserted = self.conn.execute(
            "INSERT INTO habit_completions (habit_uuid, completed_on) VALUES (?1, ?2);",
            params![habit_id.to_string(), format_day(day)],
        );

        match inserted {
            Ok(_) => Ok(event),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(RepoError::AlreadyCompleted(event))
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Err(RepoError::NotFound(habit_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn retract_completion(&self, habit_id: HabitId, day: NaiveDate) -> RepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM habit_completions WHERE habit_uuid = ?1 AND completed_on = ?2;",
            params![habit_id.to_string(), format_day(day)],
        )?;
        Ok(removed > 0)
    }

    fn history(&self, habit_id: HabitId) -> RepoResult<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT completed_on
             FROM habit_completions
             WHERE habit_uuid = ?1
             ORDER BY completed_on ASC;",
        )?;
        let mut rows = stmt.query([habit_id.to_string()])?;
        let mut days = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            days.push(parse_completion_day(&value)?);
        }
        Ok(days)
    }

    fn latest_completion_before(
        &self,
        habit_id: HabitId,
        day: NaiveDate,
    ) -> RepoResult<Option<NaiveDate>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT completed_on
                 FROM habit_completions
                 WHERE habit_uuid = ?1 AND completed_on < ?2
                 ORDER BY completed_on DESC
                 LIMIT 1;",
                params![habit_id.to_string(), format_day(day)],
                |row| row.get(0),
            )
            .optional()?;
        value.as_deref().map(parse_completion_day).transpose()
    }

    fn completion_count(&self, habit_id: HabitId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM habit_completions WHERE habit_uuid = ?1;",
            [habit_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_completion_day(value: &str) -> RepoResult<NaiveDate> {
    parse_day(value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid day `{value}` in habit_completions.completed_on"
        ))
    })
}
