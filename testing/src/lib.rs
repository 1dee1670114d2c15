//! # Seatbook Testing
//!
//! Testing utilities and in-memory backends for Seatbook.
//!
//! This crate provides:
//! - [`InMemoryDocumentStore`]: the document database seam, in memory, with
//!   failure injection
//! - [`MockIdentityProvider`]: scripted sign-in/sign-out and session changes
//! - [`InMemoryLocalStorage`]: key/value storage backed by a map
//! - [`FixedClock`]: deterministic time
//! - [`ReducerTest`]: Given-When-Then reducer assertions
//!
//! The in-memory backends are complete implementations, so the demo binary
//! runs on them as well.
//!
//! ## Example
//!
//! ```ignore
//! use seatbook_testing::{InMemoryDocumentStore, MockIdentityProvider, test_clock};
//!
//! #[tokio::test]
//! async fn books_a_seat() {
//!     let db = Arc::new(InMemoryDocumentStore::new());
//!     let identity = Arc::new(MockIdentityProvider::with_user(test_user()));
//!     // build components over `db` and `identity`...
//! }
//! ```

use chrono::{DateTime, Utc};
use seatbook_core::environment::{Clock, LocalStorage, StorageError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub mod document_mocks;
pub mod identity_mocks;

pub use document_mocks::InMemoryDocumentStore;
pub use identity_mocks::MockIdentityProvider;
pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Arc, Clock, DateTime, HashMap, LocalStorage, Mutex, StorageError, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`]. Clones share the same instant.
    ///
    /// # Example
    ///
    /// ```
    /// use seatbook_testing::mocks::FixedClock;
    /// use seatbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            if let Ok(mut guard) = self.time.lock() {
                *guard = time;
            }
        }

        /// Move the clock forward by `delta`
        pub fn advance(&self, delta: chrono::Duration) {
            if let Ok(mut guard) = self.time.lock() {
                *guard += delta;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |guard| *guard)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen
    /// in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Map-backed [`LocalStorage`].
    ///
    /// Clones share the same map, so a test can hand one clone to a component
    /// and inspect the other.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryLocalStorage {
        items: Arc<Mutex<HashMap<String, String>>>,
        fail_writes: Arc<Mutex<bool>>,
    }

    impl InMemoryLocalStorage {
        /// Create an empty storage
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a storage pre-populated with one item
        #[must_use]
        pub fn with_item(key: &str, value: &str) -> Self {
            let storage = Self::new();
            if let Ok(mut items) = storage.items.lock() {
                items.insert(key.to_string(), value.to_string());
            }
            storage
        }

        /// Make every subsequent `set_item` fail (or succeed again)
        pub fn set_fail_writes(&self, fail: bool) {
            if let Ok(mut flag) = self.fail_writes.lock() {
                *flag = fail;
            }
        }

        /// Direct read for assertions
        #[must_use]
        pub fn peek(&self, key: &str) -> Option<String> {
            self.items.lock().ok().and_then(|items| items.get(key).cloned())
        }
    }

    impl LocalStorage for InMemoryLocalStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            let items = self
                .items
                .lock()
                .map_err(|_| StorageError::ReadFailed("Mutex lock failed".to_string()))?;
            Ok(items.get(key).cloned())
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let failing = self.fail_writes.lock().map(|flag| *flag).unwrap_or(false);
            if failing {
                return Err(StorageError::WriteFailed("quota exceeded".to_string()));
            }

            self.items
                .lock()
                .map_err(|_| StorageError::WriteFailed("Mutex lock failed".to_string()))?
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryLocalStorage, test_clock};
