//! Per-habit mutual exclusion for streak mutations.
//!
//! # Invariants
//! - Two holders of clones of the same `HabitLocks` never run a guarded
//!   section for the same habit concurrently.
//! - Different habits never contend on each other's lock.
//! - Idle entries are pruned once the table grows past a threshold.

use crate::model::habit::HabitId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const PRUNE_THRESHOLD: usize = 256;

/// Shared arena of per-habit locks. Clones share the same arena.
#[derive(Debug, Clone, Default)]
pub struct HabitLocks {
    table: Arc<Mutex<HashMap<HabitId, Arc<Mutex<()>>>>>,
}

impl HabitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock cell for one habit, creating it on first use.
    pub fn lock_for(&self, habit_id: HabitId) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table.len() >= PRUNE_THRESHOLD {
            table.retain(|_, cell| Arc::strong_count(cell) > 1);
        }
        Arc::clone(table.entry(habit_id).or_default())
    }

    /// Number of habits with a live lock cell.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Blocks until the habit's cell is free.
///
/// The cell guards no data, so a poisoned lock is taken over as-is.
pub fn acquire(cell: &Mutex<()>) -> MutexGuard<'_, ()> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{acquire, HabitLocks};
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn same_habit_shares_one_cell_across_clones() {
        let locks = HabitLocks::new();
        let other = locks.clone();
        let habit_id = Uuid::new_v4();

        let first = locks.lock_for(habit_id);
        let second = other.lock_for(habit_id);
        assert!(Arc::ptr_eq(&first, &second));

        let _guard = acquire(&first);
        assert!(second.try_lock().is_err());
    }

    #[test]
    fn different_habits_do_not_contend() {
        let locks = HabitLocks::new();
        let first = locks.lock_for(Uuid::new_v4());
        let second = locks.lock_for(Uuid::new_v4());

        let _guard = acquire(&first);
        assert!(second.try_lock().is_ok());
        assert_eq!(locks.len(), 2);
    }
}
