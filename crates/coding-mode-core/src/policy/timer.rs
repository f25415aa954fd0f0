//! Named one-shot wake timers.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::PolicyError;

/// Platform alarm service. Fires a named callback at or after the scheduled
/// instant, possibly late, possibly more than once.
pub trait WakeTimer {
    /// Replaces any existing alarm with the same name.
    fn schedule_at(&self, name: &str, at_ms: i64) -> Result<(), PolicyError>;

    fn cancel(&self, name: &str) -> Result<(), PolicyError>;

    fn scheduled(&self, name: &str) -> Result<Option<i64>, PolicyError>;
}

impl<T: WakeTimer + ?Sized> WakeTimer for &T {
    fn schedule_at(&self, name: &str, at_ms: i64) -> Result<(), PolicyError> {
        (**self).schedule_at(name, at_ms)
    }

    fn cancel(&self, name: &str) -> Result<(), PolicyError> {
        (**self).cancel(name)
    }

    fn scheduled(&self, name: &str) -> Result<Option<i64>, PolicyError> {
        (**self).scheduled(name)
    }
}

#[derive(Debug, Default)]
pub struct MemoryWakeTimer {
    alarms: RefCell<BTreeMap<String, i64>>,
}

impl MemoryWakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.alarms.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.borrow().is_empty()
    }
}

impl WakeTimer for MemoryWakeTimer {
    fn schedule_at(&self, name: &str, at_ms: i64) -> Result<(), PolicyError> {
        self.alarms.borrow_mut().insert(name.to_string(), at_ms);
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<(), PolicyError> {
        self.alarms.borrow_mut().remove(name);
        Ok(())
    }

    fn scheduled(&self, name: &str) -> Result<Option<i64>, PolicyError> {
        Ok(self.alarms.borrow().get(name).copied())
    }
}
