use chrono::Utc;
use std::sync::Arc;

/// Source of the calendar day used for daily gating
pub trait Clock: Send + Sync {
    /// Today's date as YYYY-MM-DD
    fn today(&self) -> String;
}

/// UTC wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }
}

/// A clock stuck on one day, settable from tests
pub struct FixedClock {
    day: parking_lot::RwLock<String>,
}

impl FixedClock {
    pub fn new(day: &str) -> Self {
        Self {
            day: parking_lot::RwLock::new(day.to_string()),
        }
    }

    pub fn set(&self, day: &str) {
        *self.day.write() = day.to_string();
    }
}

impl Clock for FixedClock {
    fn today(&self) -> String {
        self.day.read().clone()
    }
}

pub type SharedClock = Arc<dyn Clock>;
