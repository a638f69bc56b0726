//! Habit directory repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `habits` storage.
//! - Allocate the zeroed streak row on create; cascade ledger and streak
//!   rows on delete.
//!
//! # Invariants
//! - Write paths must call `Habit::validate()` before SQL mutations.
//! - Create writes the habit row and its streak row in one transaction.
//! - Delete relies on `ON DELETE CASCADE`, so the habit, its completions,
//!   and its streak row disappear in a single statement.

use crate::model::habit::{Frequency, Habit, HabitId};
use crate::repo::ensure_connection_ready;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::streak_repo::{SqliteStreakRepository, StreakRepository};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const HABIT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    frequency,
    target_count,
    created_at,
    updated_at
FROM habits";

/// Repository interface for habit CRUD operations.
pub trait HabitRepository {
    /// Inserts a habit plus its zeroed streak row and returns the stored record.
    fn create_habit(&self, habit: &Habit) -> RepoResult<Habit>;
    fn update_habit(&self, habit: &Habit) -> RepoResult<()>;
    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>>;
    /// Lists habits newest first (`created_at DESC, uuid ASC`).
    fn list_habits(&self) -> RepoResult<Vec<Habit>>;
    /// Hard-deletes a habit together with its ledger and streak rows.
    fn delete_habit(&self, id: HabitId) -> RepoResult<()>;
    fn habit_exists(&self, id: HabitId) -> RepoResult<bool>;
}

/// SQLite-backed habit repository.
pub struct SqliteHabitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHabitRepository<'conn> {
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

impl HabitRepository for SqliteHabitRepository<'_> {
    fn create_habit(&self, habit: &Habit) -> RepoResult<Habit> {
        habit.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO habits (
                uuid,
                name,
                description,
                frequency,
                target_count
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                habit.id.to_string(),
                habit.name.as_str(),
                habit.description.as_str(),
                habit.frequency.as_str(),
                habit.target_count,
            ],
        )?;
        SqliteStreakRepository::new(&tx).init_streak(habit.id)?;
        let stored = load_habit(&tx, habit.id)?.ok_or(RepoError::NotFound(habit.id))?;
        tx.commit()?;

        info!("event=habit_create module=repo status=ok habit_id={}", habit.id);
        Ok(stored)
    }

    fn update_habit(&self, habit: &Habit) -> RepoResult<()> {
        habit.validate()?;

        let changed = self.conn.execute(
            "UPDATE habits
             SET
                name = ?1,
                description = ?2,
                frequency = ?3,
                target_count = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                habit.name.as_str(),
                habit.description.as_str(),
                habit.frequency.as_str(),
                habit.target_count,
                habit.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(habit.id));
        }

        Ok(())
    }

    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>> {
        load_habit(self.conn, id)
    }

    fn list_habits(&self) -> RepoResult<Vec<Habit>> {
        let mut stmt = self.conn.prepare(&format!(
            "{HABIT_SELECT_SQL} ORDER BY created_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut habits = Vec::new();

        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }

        Ok(habits)
    }

    fn delete_habit(&self, id: HabitId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!("event=habit_delete module=repo status=ok habit_id={id}");
        Ok(())
    }

    fn habit_exists(&self, id: HabitId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM habits WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn load_habit(conn: &Connection, id: HabitId) -> RepoResult<Option<Habit>> {
    let mut stmt = conn.prepare(&format!("{HABIT_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_habit_row(row)?));
    }
    Ok(None)
}

fn parse_habit_row(row: &Row<'_>) -> RepoResult<Habit> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in habits.uuid"))
    })?;

    let frequency_text: String = row.get("frequency")?;
    let frequency = Frequency::parse(&frequency_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid frequency `{frequency_text}` in habits.frequency"
        ))
    })?;

    let target_count: i64 = row.get("target_count")?;
    let target_count = u32::try_from(target_count).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid target_count `{target_count}` in habits.target_count"
        ))
    })?;

    let habit = Habit {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        frequency,
        target_count,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    habit.validate()?;
    Ok(habit)
}

/// Returns `Ok(())` when the habit exists, `NotFound` otherwise.
pub(crate) fn require_habit(conn: &Connection, id: HabitId) -> RepoResult<()> {
    if SqliteHabitRepository::new(conn).habit_exists(id)? {
        Ok(())
    } else {
        Err(RepoError::NotFound(id))
    }
}

