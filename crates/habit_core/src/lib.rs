//! Core domain logic for the habit tracker.
//! This crate owns the completion ledger, streak counters, and their
//! invariants; front ends only call into it.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::completion::CompletionEvent;
pub use model::habit::{
    Frequency, Habit, HabitDraft, HabitId, HabitPatch, HabitValidationError,
};
pub use model::streak::{longest_run, trailing_run, StreakPolicy, StreakState};
pub use repo::completion_repo::{CompletionLedger, SqliteCompletionLedger};
pub use repo::error::{RepoError, RepoResult};
pub use repo::habit_repo::{HabitRepository, SqliteHabitRepository};
pub use repo::stats_repo::{SqliteStatsRepository, StatsRepository, StreakRankRow};
pub use repo::streak_repo::{SqliteStreakRepository, StreakRepository};
pub use service::habit_locks::HabitLocks;
pub use service::habit_service::{HabitService, HabitServiceError};
pub use service::stats_service::{
    DailyCompletions, HabitStats, HabitStreakEntry, StatsReport, StatsService,
};
pub use service::streak_service::{
    CompletionOutcome, HabitOverview, RetractionOutcome, StreakError, StreakService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
