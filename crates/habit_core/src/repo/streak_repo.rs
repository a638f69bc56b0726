//! Streak counter repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist one `StreakState` row per habit.
//! - Keep the counter table in lockstep with habit lifetime.
//!
//! # Invariants
//! - A streak row is created zeroed together with its habit.
//! - Persisted counters are never negative (schema `CHECK`).

use crate::model::completion::{format_day, parse_day};
use crate::model::habit::HabitId;
use crate::model::streak::StreakState;
use crate::repo::ensure_connection_ready;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// Repository interface for per-habit streak counters.
pub trait StreakRepository {
    /// Inserts a zeroed streak row for a freshly created habit.
    fn init_streak(&self, habit_id: HabitId) -> RepoResult<StreakState>;
    /// Loads the streak row, `None` when the habit has none.
    fn get_streak(&self, habit_id: HabitId) -> RepoResult<Option<StreakState>>;
    /// Overwrites all counters. Returns `NotFound` when no row exists.
    fn save_streak(&self, state: &StreakState) -> RepoResult<()>;
}

/// SQLite-backed streak repository.
pub struct SqliteStreakRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStreakRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by the caller (e.g. inside a transaction).
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StreakRepository for SqliteStreakRepository<'_> {
    fn init_streak(&self, habit_id: HabitId) -> RepoResult<StreakState> {
        self.conn.execute(
            "INSERT INTO habit_streaks (habit_uuid, current_streak, longest_streak)
             VALUES (?1, 0, 0);",
            [habit_id.to_string()],
        )?;
        Ok(StreakState::zeroed(habit_id))
    }

    fn get_streak(&self, habit_id: HabitId) -> RepoResult<Option<StreakState>> {
        let row = self
            .conn
            .query_row(
                "SELECT habit_uuid, current_streak, longest_streak, last_completion_day
                 FROM habit_streaks
                 WHERE habit_uuid = ?1;",
                [habit_id.to_string()],
                RawStreakRow::read,
            )
            .optional()?;

        row.map(RawStreakRow::into_state).transpose()
    }

    fn save_streak(&self, state: &StreakState) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE habit_streaks
             SET current_streak = ?2,
                 longest_streak = ?3,
                 last_completion_day = ?4
             WHERE habit_uuid = ?1;",
            params![
                state.habit_id.to_string(),
                state.current_streak,
                state.longest_streak,
                state.last_completion_day.map(format_day),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(state.habit_id));
        }
        Ok(())
    }
}

struct RawStreakRow {
    habit_uuid: String,
    current_streak: i64,
    longest_streak: i64,
    last_completion_day: Option<String>,
}

impl RawStreakRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            habit_uuid: row.get("habit_uuid")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            last_completion_day: row.get("last_completion_day")?,
        })
    }

    fn into_state(self) -> RepoResult<StreakState> {
        let habit_id = Uuid::parse_str(&self.habit_uuid).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid value `{}` in habit_streaks.habit_uuid",
                self.habit_uuid
            ))
        })?;
        let current_streak = counter(self.current_streak, "current_streak")?;
        let longest_streak = counter(self.longest_streak, "longest_streak")?;
        let last_completion_day = match self.last_completion_day {
            Some(value) => Some(parse_day(&value).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid day `{value}` in habit_streaks.last_completion_day"
                ))
            })?),
            None => None,
        };

        Ok(StreakState {
            habit_id,
            current_streak,
            longest_streak,
            last_completion_day,
        })
    }
}

fn counter(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid counter `{value}` in habit_streaks.{column}"))
    })
}
