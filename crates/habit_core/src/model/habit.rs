//! Habit domain model.
//!
//! # Responsibility
//! - Define the canonical habit record owned by the habit directory.
//! - Normalize create/update input (default frequency and target count).
//!
//! # Invariants
//! - `id` is stable and never reused for another habit.
//! - `name` is never blank after trim.
//! - `target_count` is at least 1.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every habit.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type HabitId = Uuid;

/// Declared cadence of a habit.
///
/// Persisted and returned to callers, but the streak engine treats every
/// habit as daily regardless of this value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Once per calendar day.
    #[default]
    Daily,
    /// Once per week.
    Weekly,
    /// Several times per week.
    MultipleTimesWeek,
}

impl Frequency {
    /// Storage/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::MultipleTimesWeek => "multiple_times_week",
        }
    }

    /// Parses the storage/wire representation.
    ///
    /// Blank input falls back to `Daily`, mirroring the create defaults.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "" | "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "multiple_times_week" => Some(Self::MultipleTimesWeek),
            _ => None,
        }
    }
}

/// Validation errors for habit records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    /// `id` must not be the nil UUID.
    NilId,
    /// `name` is empty after trim.
    BlankName,
    /// `target_count` must be >= 1.
    InvalidTargetCount(u32),
    /// Frequency text is not one of the known values.
    UnknownFrequency(String),
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "habit id must not be nil"),
            Self::BlankName => write!(f, "habit name is required"),
            Self::InvalidTargetCount(value) => {
                write!(f, "target_count must be >= 1, got {value}")
            }
            Self::UnknownFrequency(value) => write!(
                f,
                "unknown frequency `{value}`; expected daily|weekly|multiple_times_week"
            ),
        }
    }
}

impl Error for HabitValidationError {}

/// Canonical habit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub description: String,
    pub frequency: Frequency,
    pub target_count: u32,
    /// Unix epoch milliseconds, assigned by storage on insert.
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped by storage on update.
    pub updated_at: i64,
}

impl Habit {
    /// Creates a daily habit with a generated id and target count 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            frequency: Frequency::Daily,
            target_count: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), HabitValidationError> {
        if self.id.is_nil() {
            return Err(HabitValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(HabitValidationError::BlankName);
        }
        if self.target_count == 0 {
            return Err(HabitValidationError::InvalidTargetCount(0));
        }
        Ok(())
    }
}

/// Caller input for creating or updating a habit.
///
/// Missing fields take the same defaults a freshly created habit would get.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub target_count: Option<u32>,
}

impl HabitDraft {
    /// Creates a draft with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Applies defaults and validation, writing the result onto `habit`.
    ///
    /// A zero or missing target becomes 1; a blank or missing frequency
    /// becomes `daily`.
    pub fn apply_to(&self, habit: &mut Habit) -> Result<(), HabitValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(HabitValidationError::BlankName);
        }

        let frequency = match self.frequency.as_deref() {
            Some(value) => Frequency::parse(value)
                .ok_or_else(|| HabitValidationError::UnknownFrequency(value.to_string()))?,
            None => Frequency::Daily,
        };

        habit.name = name.to_string();
        habit.description = self.description.trim().to_string();
        habit.frequency = frequency;
        habit.target_count = match self.target_count {
            Some(0) | None => 1,
            Some(value) => value,
        };
        habit.validate()
    }
}

/// Caller input for updating a habit.
///
/// Only fields that are `Some` change; the rest keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub target_count: Option<u32>,
}

impl HabitPatch {
    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.frequency.is_none()
            && self.target_count.is_none()
    }

    /// Writes the present fields onto `habit` and re-validates it.
    ///
    /// Unlike create, an explicit zero target is rejected rather than
    /// defaulted, since the caller asked for that value.
    pub fn apply_to(&self, habit: &mut Habit) -> Result<(), HabitValidationError> {
        let mut next = habit.clone();
        if let Some(name) = self.name.as_deref() {
            next.name = name.trim().to_string();
        }
        if let Some(description) = self.description.as_deref() {
            next.description = description.trim().to_string();
        }
        if let Some(value) = self.frequency.as_deref() {
            next.frequency = Frequency::parse(value)
                .ok_or_else(|| HabitValidationError::UnknownFrequency(value.to_string()))?;
        }
        if let Some(target_count) = self.target_count {
            if target_count == 0 {
                return Err(HabitValidationError::InvalidTargetCount(0));
            }
            next.target_count = target_count;
        }
        next.validate()?;
        *habit = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Frequency, Habit, HabitDraft, HabitPatch, HabitValidationError};

    #[test]
    fn frequency_parse_defaults_blank_to_daily() {
        assert_eq!(Frequency::parse("  "), Some(Frequency::Daily));
        assert_eq!(
            Frequency::parse("multiple_times_week"),
            Some(Frequency::MultipleTimesWeek)
        );
        assert_eq!(Frequency::parse("hourly"), None);
    }

    #[test]
    fn draft_applies_defaults() {
        let mut habit = Habit::new("placeholder");
        let draft = HabitDraft {
            name: "  Read  ".to_string(),
            description: String::new(),
            frequency: None,
            target_count: Some(0),
        };
        draft.apply_to(&mut habit).unwrap();
        assert_eq!(habit.name, "Read");
        assert_eq!(habit.frequency, Frequency::Daily);
        assert_eq!(habit.target_count, 1);
    }

    #[test]
    fn draft_rejects_blank_name_and_unknown_frequency() {
        let mut habit = Habit::new("placeholder");
        let err = HabitDraft::named(" ").apply_to(&mut habit).unwrap_err();
        assert_eq!(err, HabitValidationError::BlankName);

        let draft = HabitDraft {
            frequency: Some("hourly".to_string()),
            ..HabitDraft::named("Run")
        };
        let err = draft.apply_to(&mut habit).unwrap_err();
        assert_eq!(err, HabitValidationError::UnknownFrequency("hourly".into()));
    }

    #[test]
    fn patch_keeps_fields_it_does_not_mention() {
        let mut habit = Habit::new("Walk");
        habit.description = "after lunch".to_string();
        habit.target_count = 4;
        habit.frequency = Frequency::Weekly;

        let patch = HabitPatch {
            name: Some(" Walk 20 min ".to_string()),
            ..HabitPatch::default()
        };
        patch.apply_to(&mut habit).unwrap();

        assert_eq!(habit.name, "Walk 20 min");
        assert_eq!(habit.description, "after lunch");
        assert_eq!(habit.target_count, 4);
        assert_eq!(habit.frequency, Frequency::Weekly);
    }

    #[test]
    fn rejected_patch_leaves_habit_untouched() {
        let mut habit = Habit::new("Walk");
        let patch = HabitPatch {
            name: Some("Jog".to_string()),
            target_count: Some(0),
            ..HabitPatch::default()
        };
        let err = patch.apply_to(&mut habit).unwrap_err();

        assert_eq!(err, HabitValidationError::InvalidTargetCount(0));
        assert_eq!(habit.name, "Walk");
        assert!(HabitPatch::default().is_empty());
    }
}
