//! Streak engine use-case service.
//!
//! # Responsibility
//! - Record and retract today's completion for a habit.
//! - Keep `current`/`longest` streak counters in step with the ledger.
//! - Recompute `longest` from full history when a retraction shortens the
//!   record-holding streak.
//!
//! # Invariants
//! - Mutations for one habit are serialized by `HabitLocks` and run inside a
//!   single IMMEDIATE transaction; ledger write and counter write commit or
//!   roll back together.
//! - Completing twice on one day and retracting an absent day are no-ops.
//! - `current_streak <= longest_streak` after every operation.
//! - A missing streak row for an existing habit is surfaced as
//!   `StateInconsistent`, never silently recreated.

use crate::clock::Clock;
use crate::model::habit::{Habit, HabitId};
use crate::model::streak::{longest_run, trailing_run, Retraction, StreakPolicy, StreakState};
use crate::repo::completion_repo::{CompletionLedger, SqliteCompletionLedger};
use crate::repo::ensure_connection_ready;
use crate::repo::error::RepoError;
use crate::repo::habit_repo::{require_habit, HabitRepository, SqliteHabitRepository};
use crate::repo::streak_repo::{SqliteStreakRepository, StreakRepository};
use crate::service::habit_locks::{acquire, HabitLocks};
use chrono::NaiveDate;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors surfaced by streak engine operations.
#[derive(Debug)]
pub enum StreakError {
    /// Referenced habit does not exist.
    UnknownHabit(HabitId),
    /// Storage failure; nothing was committed.
    Storage(RepoError),
    /// Ledger and counter table disagree and need out-of-band repair.
    StateInconsistent {
        habit_id: HabitId,
        details: &'static str,
    },
}

impl StreakError {
    /// Returns whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl Display for StreakError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownHabit(id) => write!(f, "habit not found: {id}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
            Self::StateInconsistent { habit_id, details } => {
                write!(f, "inconsistent streak state for {habit_id}: {details}")
            }
        }
    }
}

impl Error for StreakError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StreakError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(habit_id) => Self::UnknownHabit(habit_id),
            other => Self::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for StreakError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.into())
    }
}

/// Result of `complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "streak", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Today's completion was recorded and counters advanced.
    Recorded(StreakState),
    /// Today was already completed; nothing changed.
    AlreadyCompleted(StreakState),
}

impl CompletionOutcome {
    pub fn state(&self) -> &StreakState {
        match self {
            Self::Recorded(state) | Self::AlreadyCompleted(state) => state,
        }
    }

    pub fn was_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Result of `uncomplete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "streak", rename_all = "snake_case")]
pub enum RetractionOutcome {
    /// Today's completion was removed and counters rolled back.
    Retracted(StreakState),
    /// Today had no completion; nothing changed.
    NotCompleted(StreakState),
}

impl RetractionOutcome {
    pub fn state(&self) -> &StreakState {
        match self {
            Self::Retracted(state) | Self::NotCompleted(state) => state,
        }
    }

    pub fn was_retracted(&self) -> bool {
        matches!(self, Self::Retracted(_))
    }
}

/// Habit record joined with its streak counters and today's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitOverview {
    #[serde(flatten)]
    pub habit: Habit,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completion_day: Option<NaiveDate>,
    pub total_completions: u32,
    pub is_completed_today: bool,
}

/// Streak engine over one SQLite connection.
///
/// Threads that share a database each open their own connection and pass
/// clones of one `HabitLocks` through `with_locks`.
pub struct StreakService<'conn, C: Clock> {
    conn: &'conn Connection,
    clock: C,
    locks: HabitLocks,
    policy: StreakPolicy,
}

impl<'conn, C: Clock> StreakService<'conn, C> {
    /// Creates the engine from a migrated connection and a day source.
    pub fn try_new(conn: &'conn Connection, clock: C) -> Result<Self, StreakError> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            clock,
            locks: HabitLocks::new(),
            policy: StreakPolicy::default(),
        })
    }

    /// Shares a lock arena with other engines on the same database.
    pub fn with_locks(mut self, locks: HabitLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Chooses how completions after a missed day are counted.
    pub fn with_policy(mut self, policy: StreakPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> StreakPolicy {
        self.policy
    }

    /// Records today's completion and advances the counters.
    ///
    /// # Errors
    /// - `UnknownHabit` when the habit does not exist.
    /// - `Storage` when SQLite fails; nothing is committed.
    /// - `StateInconsistent` when the habit has no streak row.
    pub fn complete(&self, habit_id: HabitId) -> Result<CompletionOutcome, StreakError> {
        let started_at = Instant::now();
        let cell = self.locks.lock_for(habit_id);
        let _guard = acquire(&cell);
        let today = self.clock.today();

        let result = self.in_transaction(habit_id, |tx| {
            let ledger = SqliteCompletionLedger::new(tx);
            let streaks = SqliteStreakRepository::new(tx);
            let state = load_state(&streaks, habit_id)?;

            if ledger.has_completion(habit_id, today)? {
                return Ok(CompletionOutcome::AlreadyCompleted(state));
            }
            match ledger.record_completion(habit_id, today) {
                Ok(_) => {}
                Err(RepoError::AlreadyCompleted(_)) => {
                    return Ok(CompletionOutcome::AlreadyCompleted(state));
                }
                Err(err) => return Err(err.into()),
            }

            let next = state.after_completion(today, self.policy);
            store_state(&streaks, &next)?;
            Ok(CompletionOutcome::Recorded(next))
        });

        match &result {
            Ok(outcome) => info!(
                "event=habit_complete module=streak status=ok habit_id={} outcome={} current={} longest={} duration_ms={}",
                habit_id,
                if outcome.was_recorded() { "recorded" } else { "already_completed" },
                outcome.state().current_streak,
                outcome.state().longest_streak,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("habit_complete", habit_id, err, started_at),
        }
        result
    }

    /// Retracts today's completion and rolls the counters back.
    ///
    /// When the shortened streak was the record holder, `longest` is
    /// recomputed from the remaining history.
    ///
    /// # Errors
    /// Same as [`StreakService::complete`].
    pub fn uncomplete(&self, habit_id: HabitId) -> Result<RetractionOutcome, StreakError> {
        let started_at = Instant::now();
        let cell = self.locks.lock_for(habit_id);
        let _guard = acquire(&cell);
        let today = self.clock.today();

        let result = self.in_transaction(habit_id, |tx| {
            let ledger = SqliteCompletionLedger::new(tx);
            let streaks = SqliteStreakRepository::new(tx);
            let state = load_state(&streaks, habit_id)?;

            if !ledger.has_completion(habit_id, today)? {
                return Ok(RetractionOutcome::NotCompleted(state));
            }
            ledger.retract_completion(habit_id, today)?;

            let previous = ledger.latest_completion_before(habit_id, today)?;
            let Retraction {
                state: mut next,
                recompute_longest,
            } = state.after_retraction(previous);

            if recompute_longest {
                let recomputed = longest_run(ledger.history(habit_id)?);
                if recomputed != next.longest_streak {
                    info!(
                        "event=streak_recompute module=streak status=ok habit_id={} previous_longest={} recomputed_longest={}",
                        habit_id, next.longest_streak, recomputed
                    );
                    if next.apply_recomputed_longest(recomputed) {
                        warn!(
                            "event=streak_recompute module=streak status=clamped habit_id={} recomputed_longest={} current={}",
                            habit_id, recomputed, next.current_streak
                        );
                    }
                }
            }

            store_state(&streaks, &next)?;
            Ok(RetractionOutcome::Retracted(next))
        });

        match &result {
            Ok(outcome) => info!(
                "event=habit_uncomplete module=streak status=ok habit_id={} outcome={} current={} longest={} duration_ms={}",
                habit_id,
                if outcome.was_retracted() { "retracted" } else { "not_completed" },
                outcome.state().current_streak,
                outcome.state().longest_streak,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("habit_uncomplete", habit_id, err, started_at),
        }
        result
    }

    /// Returns the stored counters for one habit.
    pub fn get_streak(&self, habit_id: HabitId) -> Result<StreakState, StreakError> {
        require_habit(self.conn, habit_id)?;
        load_state(&SqliteStreakRepository::new(self.conn), habit_id)
    }

    /// Returns whether the habit has a completion for today.
    pub fn is_completed_today(&self, habit_id: HabitId) -> Result<bool, StreakError> {
        require_habit(self.conn, habit_id)?;
        let ledger = SqliteCompletionLedger::new(self.conn);
        Ok(ledger.has_completion(habit_id, self.clock.today())?)
    }

    /// Returns every completion day for the habit, ascending.
    pub fn completion_history(&self, habit_id: HabitId) -> Result<Vec<NaiveDate>, StreakError> {
        require_habit(self.conn, habit_id)?;
        Ok(SqliteCompletionLedger::new(self.conn).history(habit_id)?)
    }

    /// Rebuilds both counters from the ledger.
    ///
    /// Repair path for `StateInconsistent`: a missing streak row is
    /// recreated, `current` becomes the run ending at the latest completion,
    /// and `longest` the longest run in history.
    pub fn rebuild_streak(&self, habit_id: HabitId) -> Result<StreakState, StreakError> {
        let started_at = Instant::now();
        let cell = self.locks.lock_for(habit_id);
        let _guard = acquire(&cell);

        let result = self.in_transaction(habit_id, |tx| {
            let ledger = SqliteCompletionLedger::new(tx);
            let streaks = SqliteStreakRepository::new(tx);
            if streaks.get_streak(habit_id)?.is_none() {
                warn!(
                    "event=streak_rebuild module=streak status=recreate habit_id={}",
                    habit_id
                );
                streaks.init_streak(habit_id)?;
            }

            let history = ledger.history(habit_id)?;
            let rebuilt = StreakState {
                habit_id,
                current_streak: trailing_run(history.iter().copied()),
                longest_streak: longest_run(history.iter().copied()),
                last_completion_day: history.last().copied(),
            };
            store_state(&streaks, &rebuilt)?;
            Ok(rebuilt)
        });

        match &result {
            Ok(state) => info!(
                "event=streak_rebuild module=streak status=ok habit_id={} current={} longest={} duration_ms={}",
                habit_id,
                state.current_streak,
                state.longest_streak,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("streak_rebuild", habit_id, err, started_at),
        }
        result
    }

    /// Joins a habit with its counters and today's status.
    pub fn overview(&self, habit: Habit) -> Result<HabitOverview, StreakError> {
        let state = self.get_streak(habit.id)?;
        let ledger = SqliteCompletionLedger::new(self.conn);
        Ok(HabitOverview {
            current_streak: state.current_streak,
            longest_streak: state.longest_streak,
            last_completion_day: state.last_completion_day,
            total_completions: ledger.completion_count(habit.id)?,
            is_completed_today: ledger.has_completion(habit.id, self.clock.today())?,
            habit,
        })
    }

    /// Overviews for every habit, newest first.
    pub fn list_overviews(&self) -> Result<Vec<HabitOverview>, StreakError> {
        SqliteHabitRepository::new(self.conn)
            .list_habits()?
            .into_iter()
            .map(|habit| self.overview(habit))
            .collect()
    }

    fn in_transaction<T>(
        &self,
        habit_id: HabitId,
        op: impl FnOnce(&Connection) -> Result<T, StreakError>,
    ) -> Result<T, StreakError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        require_habit(&tx, habit_id)?;
        let value = op(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn load_state(
    streaks: &SqliteStreakRepository<'_>,
    habit_id: HabitId,
) -> Result<StreakState, StreakError> {
    streaks
        .get_streak(habit_id)?
        .ok_or(StreakError::StateInconsistent {
            habit_id,
            details: "streak row missing for existing habit",
        })
}

fn store_state(
    streaks: &SqliteStreakRepository<'_>,
    state: &StreakState,
) -> Result<(), StreakError> {
    if !state.is_consistent() {
        return Err(StreakError::StateInconsistent {
            habit_id: state.habit_id,
            details: "current streak exceeds longest streak",
        });
    }
    match streaks.save_streak(state) {
        Ok(()) => Ok(()),
        Err(RepoError::NotFound(habit_id)) => Err(StreakError::StateInconsistent {
            habit_id,
            details: "streak row vanished during update",
        }),
        Err(err) => Err(err.into()),
    }
}

fn log_failure(event: &str, habit_id: HabitId, err: &StreakError, started_at: Instant) {
    let error_code = match err {
        StreakError::UnknownHabit(_) => "unknown_habit",
        StreakError::Storage(err) if err.is_transient() => "storage_busy",
        StreakError::Storage(_) => "storage_error",
        StreakError::StateInconsistent { .. } => "state_inconsistent",
    };
    error!(
        "event={} module=streak status=error habit_id={} duration_ms={} error_code={} error={}",
        event,
        habit_id,
        started_at.elapsed().as_millis(),
        error_code,
        err
    );
}
