//! # Credit Ledger
//!
//! Persistence port for the one piece of state that outlives a session: the
//! remaining credit balance, stored under a fixed key. The loop writes
//! through this port on every successfully executed command and on explicit
//! reset; the session reads it once at construction.

use scenecraft_error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Credits granted to a fresh ledger
pub const DEFAULT_CREDITS: u32 = 10;

/// Fixed key the balance is persisted under
pub const CREDITS_KEY: &str = "scenecraft_credits";

/// Persistence port for the credit balance
pub trait CreditStore: Send + Sync {
    /// Read the persisted balance; None if absent or unreadable
    fn load(&self) -> Option<u32>;

    /// Persist the balance
    fn save(&self, credits: u32) -> Result<()>;
}

/// In-memory ledger (volatile, but useful for testing).
///
/// Keeps every saved value so tests can assert when writes happened.
#[derive(Debug, Default)]
pub struct MemoryCreditStore {
    values: Mutex<Vec<u32>>,
}

impl MemoryCreditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credits(credits: u32) -> Self {
        Self {
            values: Mutex::new(vec![credits]),
        }
    }

    /// Every value ever saved, oldest first
    pub fn saved(&self) -> Vec<u32> {
        self.values.lock().unwrap().clone()
    }
}

impl CreditStore for MemoryCreditStore {
    fn load(&self) -> Option<u32> {
        self.values.lock().unwrap().last().copied()
    }

    fn save(&self, credits: u32) -> Result<()> {
        self.values.lock().unwrap().push(credits);
        Ok(())
    }
}

/// File-backed ledger: one JSON file named after the fixed key.
pub struct FileCreditStore {
    path: PathBuf,
}

impl FileCreditStore {
    /// Create a ledger under the given state directory
    pub fn new(state_dir: impl AsRef<Path>) -> Result<Self> {
        let state_dir = state_dir.as_ref();
        std::fs::create_dir_all(state_dir).map_err(|e| {
            Error::storage_failed(format!("failed to create state dir: {}", e))
                .with_operation("ledger::new")
                .with_context("path", state_dir.display().to_string())
        })?;
        Ok(Self {
            path: state_dir.join(format!("{}.json", CREDITS_KEY)),
        })
    }
}

impl CreditStore for FileCreditStore {
    fn load(&self) -> Option<u32> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        // Malformed or negative stored values fall back to None, so the
        // caller reverts to the default grant
        serde_json::from_str::<u32>(content.trim()).ok()
    }

    fn save(&self, credits: u32) -> Result<()> {
        std::fs::write(&self.path, credits.to_string()).map_err(|e| {
            Error::storage_failed(format!("failed to write {}: {}", self.path.display(), e))
                .with_operation("ledger::save")
        })
    }
}

/// Balance to start a session with: the persisted value, or the default
pub fn load_or_default(store: &dyn CreditStore) -> u32 {
    store.load().unwrap_or(DEFAULT_CREDITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCreditStore::new();
        assert_eq!(store.load(), None);
        assert_eq!(load_or_default(&store), DEFAULT_CREDITS);

        store.save(7).unwrap();
        assert_eq!(store.load(), Some(7));
        store.save(6).unwrap();
        assert_eq!(store.saved(), vec![7, 6]);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCreditStore::new(dir.path()).unwrap();

        assert_eq!(store.load(), None);
        store.save(4).unwrap();
        assert_eq!(store.load(), Some(4));

        // a second handle over the same directory sees the value
        let other = FileCreditStore::new(dir.path()).unwrap();
        assert_eq!(other.load(), Some(4));
    }

    #[test]
    fn test_file_store_rejects_malformed_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCreditStore::new(dir.path()).unwrap();

        let path = dir.path().join(format!("{}.json", CREDITS_KEY));
        std::fs::write(&path, "not a number").unwrap();
        assert_eq!(store.load(), None);
        assert_eq!(load_or_default(&store), DEFAULT_CREDITS);

        std::fs::write(&path, "-3").unwrap();
        assert_eq!(store.load(), None);
    }
}
