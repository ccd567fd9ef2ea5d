use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Months, NaiveDate};

/// Source of the platform's billing month.
pub trait Calendar: Send + Sync {
    /// Date of the current billing month.
    fn current_date(&self) -> NaiveDate;

    /// Move to the next billing month and return its date.
    fn add_month(&self) -> NaiveDate;
}

/// Calendar that starts at a fixed date and only moves when `add_month` is called.
#[derive(Debug)]
pub struct MonthCounter {
    start: NaiveDate,
    elapsed: AtomicU32,
}

impl MonthCounter {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            start,
            elapsed: AtomicU32::new(0),
        }
    }

    pub fn elapsed_months(&self) -> u32 {
        self.elapsed.load(Ordering::Acquire)
    }
}

impl Calendar for MonthCounter {
    fn current_date(&self) -> NaiveDate {
        shift_months(self.start, self.elapsed_months())
    }

    fn add_month(&self) -> NaiveDate {
        let elapsed = self.elapsed.fetch_add(1, Ordering::AcqRel) + 1;
        shift_months(self.start, elapsed)
    }
}

/// Adds whole months, clamping the day to the end of shorter months.
pub(crate) fn shift_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}
