mod config;
pub mod database;
mod memory;

pub use config::{AuthConfig, BlockingConfig, Config, SessionConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde_json::Value;

use crate::error::StorageError;

/// Durable key-value store holding the session record.
///
/// Each call is atomic on its own; nothing spans calls, so callers write all
/// fields of one logical update through a single [`Store::set_many`].
pub trait Store {
    /// `Ok(None)` means the key was never written, which is distinct from a
    /// stored JSON `null`.
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StorageError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.set_many(&[(key, value)])
    }
}

impl<T: Store + ?Sized> Store for &T {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key)
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        (**self).set_many(entries)
    }
}

/// Returns `$CODING_MODE_DATA_DIR` if set, else `~/.config/coding-mode[-dev]/`
/// based on CODING_MODE_ENV.
///
/// Set CODING_MODE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("CODING_MODE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CODING_MODE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("coding-mode-dev")
            } else {
                base_dir.join("coding-mode")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
