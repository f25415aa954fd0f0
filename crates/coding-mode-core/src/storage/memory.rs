use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use serde_json::Value;

use super::Store;
use crate::error::StorageError;

/// In-process store with the same contract as [`super::Database`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, Value>>,
    unavailable: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, as if the backing store went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Copy of everything stored, for assertions.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.borrow().clone()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable.get() {
            return Err(StorageError::QueryFailed("store unavailable".into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        self.check()?;
        let mut map = self.entries.borrow_mut();
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}
