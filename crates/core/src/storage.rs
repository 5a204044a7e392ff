//! Durable key-value storage for the archive.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// The error type for [`Storage`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key cannot be used by this storage.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    /// The underlying medium failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A minimal keyed store of string records.
///
/// Implementations decide where the records live (memory, a directory,
/// an embedded database, a remote service). Callers treat every failure
/// as non-fatal.
pub trait Storage: Send + 'static {
    /// Reads the record stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the record stored under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: Storage + ?Sized> Storage for Box<T> {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    #[inline]
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Storage that lives in memory.
///
/// Clones share the same records, so a test can keep one clone and look
/// at what the session store wrote through another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let records =
            self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut records =
            self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Storage that keeps one `<key>.json` file per record in a directory.
///
/// Writes go to a temporary file that is synced and then renamed over the
/// record, so a crash never leaves a half-written archive behind.
///
/// Every call blocks on the file system, and the session store calls
/// [`Storage::set`] from the client's actor task in the order changes
/// happen. On a `current_thread` runtime that stalls every other task for
/// the length of an fsync; run the client on a multi-threaded runtime.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) a storage directory.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Returns the directory records are kept in.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.record_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.record_path(key)?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        trace!("wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_shares_records() {
        let storage = MemoryStorage::new();
        let mut writer = storage.clone();
        assert_eq!(storage.get("k").unwrap(), None);
        writer.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path().join("data")).unwrap();
        assert_eq!(storage.get("atena-chats").unwrap(), None);

        storage.set("atena-chats", "[]").unwrap();
        storage.set("atena-chats", "[1]").unwrap();
        assert_eq!(storage.get("atena-chats").unwrap().as_deref(), Some("[1]"));
        assert!(!storage.dir().join("atena-chats.json.tmp").exists());

        // A new handle on the same directory sees the record.
        let reopened = FileStorage::open(storage.dir()).unwrap();
        assert_eq!(
            reopened.get("atena-chats").unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.get(""), Err(StorageError::InvalidKey(_))));
    }
}
