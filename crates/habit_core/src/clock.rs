//! Calendar-day clock capability.
//!
//! # Responsibility
//! - Supply the process-wide "today" to the streak engine.
//! - Let tests pin or advance the day deterministically.
//!
//! # Invariants
//! - A clock yields a calendar date only; time of day never leaks into
//!   streak logic.

use chrono::{Days, Local, NaiveDate};
use std::sync::{Arc, PoisonError, RwLock};

/// Source of the current calendar day.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// Local-timezone wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock. Clones share the same day.
#[derive(Debug, Clone)]
pub struct FixedClock {
    day: Arc<RwLock<NaiveDate>>,
}

impl FixedClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Arc::new(RwLock::new(day)),
        }
    }

    /// Pins the clock to `day`.
    pub fn set(&self, day: NaiveDate) {
        *self.day.write().unwrap_or_else(PoisonError::into_inner) = day;
    }

    /// Moves the clock forward by `days` and returns the new day.
    ///
    /// Saturates at the last representable date.
    pub fn advance_days(&self, days: u64) -> NaiveDate {
        let mut guard = self.day.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = guard.checked_add_days(Days::new(days)) {
            *guard = next;
        }
        *guard
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.day.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock};
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_clones_share_the_day() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let shared = clock.clone();

        let next = clock.advance_days(1);
        assert_eq!(next, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(shared.today(), next);

        shared.set(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }
}
