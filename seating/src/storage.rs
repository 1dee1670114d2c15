//! File-backed client-local storage.

use seatbook_core::environment::{LocalStorage, StorageError};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// [`LocalStorage`] kept as a flat JSON object in one file.
///
/// A missing file reads as empty. Writes go to a sibling temporary file that
/// is renamed over the original.
#[derive(Debug)]
pub struct FileLocalStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLocalStorage {
    /// Storage at `path`; nothing is touched until the first access
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StorageError::ReadFailed(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::ReadFailed(format!("{}: {e}", self.path.display()))),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let failed = |e: &dyn std::fmt::Display| {
            StorageError::WriteFailed(format!("{}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| failed(&e))?;
        }

        let json = serde_json::to_string_pretty(items).map_err(|e| failed(&e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| failed(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| failed(&e))
    }
}

impl LocalStorage for FileLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::ReadFailed("Mutex lock failed".to_string()))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::WriteFailed("Mutex lock failed".to_string()))?;

        let mut items = self.read_all().map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("seatbook-{}", uuid::Uuid::new_v4().simple()))
            .join("preferences.json")
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let storage = FileLocalStorage::new(temp_path());
        assert_eq!(storage.get_item("theme"), Ok(None));
    }

    #[test]
    fn values_survive_a_new_instance() {
        let path = temp_path();
        let storage = FileLocalStorage::new(&path);
        storage.set_item("theme", "dark").unwrap();
        storage.set_item("lang", "en").unwrap();
        storage.set_item("theme", "light").unwrap();

        let reopened = FileLocalStorage::new(&path);
        assert_eq!(reopened.get_item("theme"), Ok(Some("light".to_string())));
        assert_eq!(reopened.get_item("lang"), Ok(Some("en".to_string())));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_is_a_read_error() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let storage = FileLocalStorage::new(&path);
        assert!(matches!(storage.get_item("theme"), Err(StorageError::ReadFailed(_))));
        assert!(matches!(
            storage.set_item("theme", "dark"),
            Err(StorageError::WriteFailed(_))
        ));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
