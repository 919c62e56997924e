//! Durable key-value slots backing the persistence adapter.
//!
//! Each slot holds one string value under a string key, overwritten on every write.

use std::collections::HashMap;

use crate::config::{DashboardConfig, StorageBackend};
use crate::error::AppError;

pub mod sqlite;

pub use sqlite::SqliteStorage;

pub trait KeyValueStorage {
    /// `Ok(None)` when the key has never been written.
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), AppError>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).set_item(key, value)
    }
}

/// Process-local storage. Optionally enforces a byte quota on stored values so callers can
/// exercise the "storage full" path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    items: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        if let Some(quota) = self.quota_bytes {
            let others: usize = self
                .items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(AppError::new(
                    "STORAGE_QUOTA_EXCEEDED",
                    "Storage quota exceeded",
                )
                .with_details(format!("key={key}; needed={needed}; quota={quota}")));
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Build the storage backend selected by `config`.
pub fn create_storage(config: &DashboardConfig) -> Result<Box<dyn KeyValueStorage>, AppError> {
    match config.backend {
        StorageBackend::Sqlite => {
            tracing::info!(path = %config.db_path.display(), "opening sqlite storage");
            Ok(Box::new(SqliteStorage::open(&config.db_path)?))
        }
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage; nothing will outlive this process");
            Ok(Box::new(InMemoryStorage::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let s = InMemoryStorage::new();
        assert_eq!(s.get_item("nope").unwrap(), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let mut s = InMemoryStorage::new();
        s.set_item("k", "one").unwrap();
        s.set_item("k", "two").unwrap();
        assert_eq!(s.get_item("k").unwrap().as_deref(), Some("two"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn quota_rejects_oversized_write_and_keeps_old_value() {
        let mut s = InMemoryStorage::with_quota(8);
        s.set_item("k", "small").unwrap();
        let err = s.set_item("k", "much too large").unwrap_err();
        assert_eq!(err.code, "STORAGE_QUOTA_EXCEEDED");
        assert_eq!(s.get_item("k").unwrap().as_deref(), Some("small"));
    }
}
