//! Completion event model.

use crate::model::habit::HabitId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage/wire format for completion days.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// One completion of a habit on a calendar day.
///
/// Immutable once recorded; removed only by retracting that exact day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub habit_id: HabitId,
    /// Serialized as ISO `YYYY-MM-DD`; no time-of-day semantics.
    pub day: NaiveDate,
}

impl CompletionEvent {
    pub fn new(habit_id: HabitId, day: NaiveDate) -> Self {
        Self { habit_id, day }
    }
}

impl Display for CompletionEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.habit_id, self.day.format(DAY_FORMAT))
    }
}

/// Parses a stored completion day.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).ok()
}

/// Formats a completion day for storage.
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}
