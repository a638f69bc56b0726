//! Habit directory use-case service.
//!
//! # Responsibility
//! - Provide create/update/get/list/delete entry points for habits.
//! - Apply input defaults and validation before repository writes.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Deleting a habit removes its ledger events and streak state with it.

use crate::model::habit::{Habit, HabitDraft, HabitId, HabitPatch, HabitValidationError};
use crate::repo::error::RepoError;
use crate::repo::habit_repo::HabitRepository;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for habit directory use-cases.
#[derive(Debug)]
pub enum HabitServiceError {
    /// Input failed validation.
    Validation(HabitValidationError),
    /// Target habit does not exist.
    HabitNotFound(HabitId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for HabitServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::HabitNotFound(id) => write!(f, "habit not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HabitServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::HabitNotFound(_) => None,
        }
    }
}

impl From<HabitValidationError> for HabitServiceError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for HabitServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::HabitNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Habit service facade over repository implementations.
pub struct HabitService<R: HabitRepository> {
    repo: R,
}

impl<R: HabitRepository> HabitService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a habit and its zeroed streak state.
    pub fn create_habit(&self, draft: &HabitDraft) -> Result<Habit, HabitServiceError> {
        let mut habit = Habit::new(draft.name.as_str());
        draft.apply_to(&mut habit)?;
        Ok(self.repo.create_habit(&habit)?)
    }

    /// Changes the fields present in `patch`; absent fields keep their
    /// stored values. An empty patch returns the habit unchanged.
    pub fn update_habit(
        &self,
        id: HabitId,
        patch: &HabitPatch,
    ) -> Result<Habit, HabitServiceError> {
        let mut habit = self.get_habit(id)?;
        if patch.is_empty() {
            return Ok(habit);
        }
        patch.apply_to(&mut habit)?;
        self.repo.update_habit(&habit)?;
        self.get_habit(id)
    }

    /// Gets one habit, failing with `HabitNotFound` when absent.
    pub fn get_habit(&self, id: HabitId) -> Result<Habit, HabitServiceError> {
        self.repo
            .get_habit(id)?
            .ok_or(HabitServiceError::HabitNotFound(id))
    }

    /// Lists habits newest first.
    pub fn list_habits(&self) -> Result<Vec<Habit>, HabitServiceError> {
        Ok(self.repo.list_habits()?)
    }

    /// Deletes a habit with its ledger events and streak state.
    pub fn delete_habit(&self, id: HabitId) -> Result<(), HabitServiceError> {
        Ok(self.repo.delete_habit(id)?)
    }

    /// Returns whether the habit exists.
    pub fn habit_exists(&self, id: HabitId) -> Result<bool, HabitServiceError> {
        Ok(self.repo.habit_exists(id)?)
    }
}
