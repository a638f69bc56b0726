//! Domain model for habits, completion events, and streak counters.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep streak arithmetic pure so storage and transitions stay separable.
//!
//! # Invariants
//! - Every habit is identified by a stable `HabitId`.
//! - At most one completion event exists per (habit, day).

pub mod completion;
pub mod habit;
pub mod streak;
