// web-client/src/storage.rs
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;

/// Key/value persistence. Writes and removals are batched so paired entries
/// change in one step.
pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn write_all(&self, entries: &[(&str, String)]) -> Result<(), StoreError>;

    fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn write_all(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let mut map = self.entries();
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut map = self.entries();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// One JSON object per file, replaced via temp file + rename on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.path.with_extension("tmp");
        // A leftover temp file would keep its old mode
        match fs::remove_file(&tmp) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let mut file = owner_only().open(&tmp)?;
        file.write_all(&serde_json::to_vec(map)?)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    // A corrupt file must not block writes; it is replaced wholesale.
    fn load_for_update(&self) -> Result<HashMap<String, String>, StoreError> {
        match self.load() {
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!("Replacing corrupt storage file: {}", reason);
                Ok(HashMap::new())
            }
            other => other,
        }
    }
}

/// The file holds a bearer token, so it is readable by its owner only.
fn owner_only() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn write_all(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load_for_update()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        self.persist(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load_for_update()?;
        for key in keys {
            map.remove(*key);
        }
        self.persist(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_batches() {
        let storage = MemoryStorage::new();
        storage
            .write_all(&[("a", "1".to_string()), ("b", "2".to_string())])
            .unwrap();
        assert_eq!(storage.read("a").unwrap().as_deref(), Some("1"));

        storage.remove_all(&["a", "b"]).unwrap();
        assert_eq!(storage.read("a").unwrap(), None);
        assert_eq!(storage.read("b").unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStorage::new(&path)
            .write_all(&[("token", "abc".to_string())])
            .unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.read("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.read("user").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        // Both a pre-existing file and a stale temp file start world-readable
        fs::write(&path, "{}").unwrap();
        fs::write(path.with_extension("tmp"), "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        fs::set_permissions(path.with_extension("tmp"), fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileStorage::new(&path);
        storage.write_all(&[("token", "abc".to_string())]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(storage.read("token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_storage_reports_and_replaces_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.read("token"), Err(StoreError::Corrupt(_))));

        storage.remove_all(&["token", "user"]).unwrap();
        assert_eq!(storage.read("token").unwrap(), None);
    }
}
