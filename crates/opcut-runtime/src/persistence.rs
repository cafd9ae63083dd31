#![forbid(unsafe_code)]

//! Persist parts of the renderer state across sessions.
//!
//! A [`PersistedPath`] binds a storage key to a location in the state tree
//! (for example the user's settings). Before `init` the host restores the
//! stored sub-state into the initial state; afterwards
//! [`Renderer::persist`](crate::Renderer::persist) saves it whenever it
//! changes.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returned to the caller; restore keeps the initial value |
//! | `StorageError::Serialization` | Stored text is not JSON | Restore keeps the initial value, logged at `warn` |
//! | `StorageError::Unavailable` | Backend cannot be used | Returned to the caller |
//! | Missing entry | First run | Initial value kept |
//!
//! # Feature Gates
//!
//! - `state-persistence`: enables [`FileStorage`]. [`MemoryStorage`] is always
//!   available.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use opcut_core::{Path, Value, ops};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by storage backends.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    /// Stored data could not be encoded or decoded.
    Serialization(String),
    /// The backend cannot be used right now.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Key-value text store, modelled on browser local storage.
pub trait StorageBackend {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Stored text for `key`; `None` on first run.
    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the text stored under `key`.
    fn save(&self, key: &str, data: &str) -> StorageResult<()>;

    /// Forget `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;

    fn is_available(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage (always available)
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn poisoned() -> StorageError {
        StorageError::Unavailable("lock poisoned".into())
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self.data.read().map_err(|_| Self::poisoned())?;
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &str, data: &str) -> StorageResult<()> {
        let mut guard = self.data.write().map_err(|_| Self::poisoned())?;
        guard.insert(key.to_owned(), data.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self.data.write().map_err(|_| Self::poisoned())?;
        guard.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("entries", &count)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage (requires state-persistence feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "state-persistence")]
mod file_storage {
    use super::*;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path as FsPath, PathBuf};

    /// One JSON document per key inside a directory.
    ///
    /// Writes go to `{key}.json.tmp` first, are synced, then renamed over
    /// `{key}.json`, so a crash never leaves a half-written entry.
    pub struct FileStorage {
        dir: PathBuf,
    }

    impl FileStorage {
        /// Storage rooted at `dir`; the directory is created on first save.
        #[must_use]
        pub fn new(dir: impl AsRef<FsPath>) -> Self {
            Self {
                dir: dir.as_ref().to_path_buf(),
            }
        }

        /// `$XDG_STATE_HOME/opcut/{app_name}`, falling back to
        /// `~/.local/state` and then the current directory.
        #[must_use]
        pub fn default_for_app(app_name: &str) -> Self {
            Self::new(state_dir().join("opcut").join(app_name))
        }

        #[must_use]
        pub fn dir(&self) -> &FsPath {
            &self.dir
        }

        fn entry_path(&self, key: &str) -> PathBuf {
            self.dir.join(format!("{}.json", sanitize(key)))
        }
    }

    fn state_dir() -> PathBuf {
        if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(state_home);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local").join("state");
        }
        PathBuf::from(".")
    }

    /// Keys become file names; anything outside `[A-Za-z0-9._-]` maps to `_`.
    fn sanitize(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "FileStorage"
        }

        fn load(&self, key: &str) -> StorageResult<Option<String>> {
            let path = self.entry_path(key);
            match fs::read_to_string(&path) {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn save(&self, key: &str, data: &str) -> StorageResult<()> {
            fs::create_dir_all(&self.dir)?;
            let path = self.entry_path(key);
            let mut tmp = path.clone();
            tmp.set_extension("json.tmp");
            {
                let file = File::create(&tmp)?;
                let mut writer = BufWriter::new(file);
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp, &path)?;
            tracing::debug!(path = %path.display(), bytes = data.len(), "saved state entry");
            Ok(())
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            match fs::remove_file(self.entry_path(key)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }

        fn is_available(&self) -> bool {
            if !self.dir.exists() {
                return fs::create_dir_all(&self.dir).is_ok();
            }
            let probe = self.dir.join(".opcut_test_write");
            if fs::write(&probe, b"test").is_ok() {
                let _ = fs::remove_file(&probe);
                return true;
            }
            false
        }
    }

    impl fmt::Debug for FileStorage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStorage").field("dir", &self.dir).finish()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn save_load_remove_round_trip() {
            let tmp = tempfile::tempdir().unwrap();
            let storage = FileStorage::new(tmp.path().join("nested"));
            assert_eq!(storage.load("settings").unwrap(), None);
            storage.save("settings", "{\"a\":1}").unwrap();
            assert_eq!(storage.load("settings").unwrap().as_deref(), Some("{\"a\":1}"));
            assert!(!tmp.path().join("nested").join("settings.json.tmp").exists());
            storage.remove("settings").unwrap();
            storage.remove("settings").unwrap();
            assert_eq!(storage.load("settings").unwrap(), None);
        }

        #[test]
        fn keys_are_sanitized() {
            let tmp = tempfile::tempdir().unwrap();
            let storage = FileStorage::new(tmp.path());
            storage.save("../escape/me", "1").unwrap();
            assert!(tmp.path().join(".._escape_me.json").exists());
            assert!(storage.is_available());
        }
    }
}

#[cfg(feature = "state-persistence")]
pub use file_storage::FileStorage;

// ─────────────────────────────────────────────────────────────────────────────
// Persisted Sub-State
// ─────────────────────────────────────────────────────────────────────────────

/// A state location saved under a storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPath {
    pub key: String,
    pub path: Path,
}

impl PersistedPath {
    pub fn new(key: impl Into<String>, path: impl Into<Path>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Overlay the stored sub-state onto `initial`.
    ///
    /// Missing, unreadable or corrupt entries leave `initial` unchanged.
    #[must_use]
    pub fn restore(&self, storage: &dyn StorageBackend, initial: &Value) -> Value {
        match self.load(storage) {
            Ok(Some(stored)) => match ops::set(&self.path, initial, stored) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "stored state does not fit, ignoring");
                    initial.clone()
                }
            },
            Ok(None) => initial.clone(),
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    backend = storage.name(),
                    error = %e,
                    "failed to restore state, using initial value"
                );
                initial.clone()
            }
        }
    }

    /// Decode the stored sub-state, if any.
    pub fn load(&self, storage: &dyn StorageBackend) -> StorageResult<Option<Value>> {
        let Some(text) = storage.load(&self.key)? else {
            return Ok(None);
        };
        let json: serde_json::Value = serde_json::from_str(&text)?;
        Ok(Some(Value::from(json)))
    }

    /// Write the sub-state of `state` at this path (`null` when absent).
    pub fn save(&self, storage: &dyn StorageBackend, state: &Value) -> StorageResult<()> {
        let sub = ops::get_or_null(&self.path, state);
        let text = serde_json::to_string(&sub)?;
        storage.save(&self.key, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcut_core::path;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn settings() -> PersistedPath {
        PersistedPath::new("opcut.settings", path!["settings"])
    }

    #[test]
    fn restore_overlays_stored_value() {
        let storage = MemoryStorage::with_entries([("opcut.settings", r#"{"lang":"hr"}"#)]);
        let initial = Value::from(json!({"settings": {"lang": "en"}, "form": {}}));
        let state = settings().restore(&storage, &initial);
        assert_eq!(state, Value::from(json!({"settings": {"lang": "hr"}, "form": {}})));
    }

    #[test]
    fn missing_or_corrupt_entry_keeps_initial() {
        let initial = Value::from(json!({"settings": {"lang": "en"}}));
        assert_eq!(settings().restore(&MemoryStorage::new(), &initial), initial);
        let corrupt = MemoryStorage::with_entries([("opcut.settings", "{not json")]);
        assert_eq!(settings().restore(&corrupt, &initial), initial);
        assert!(matches!(
            settings().load(&corrupt),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn save_writes_sub_state_only() {
        let storage = MemoryStorage::new();
        let state = Value::from(json!({"settings": {"fps": 30}, "form": {"x": 1}}));
        settings().save(&storage, &state).unwrap();
        assert_eq!(
            storage.load("opcut.settings").unwrap().as_deref(),
            Some(r#"{"fps":30}"#)
        );
        storage.remove("opcut.settings").unwrap();
        assert_eq!(storage.load("opcut.settings").unwrap(), None);
    }
}
