//! Persistence
//!
//! A [`PersistenceGateway`] stores the history log, brush settings, the
//! palette preset and a canvas snapshot. [`PaletteStorage`] implements it on
//! top of any string [`KeyValueStore`]. Reads never fail: a missing or
//! unreadable value is logged and reported as absent.

mod autosave;
mod error;
pub mod snapshot;

pub use autosave::{Autosaver, SavePayload};
pub use error::{DecodeError, StorageError};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use crate::brush::BrushSettings;
use crate::history::HistorySnapshot;

/// Durable storage used by the editor
pub trait PersistenceGateway: Send + Sync {
    fn save_history(&self, snapshot: &HistorySnapshot) -> Result<(), StorageError>;
    fn load_history(&self) -> Option<HistorySnapshot>;

    fn save_brush_settings(&self, settings: &BrushSettings) -> Result<(), StorageError>;
    fn load_brush_settings(&self) -> Option<BrushSettings>;

    fn save_palette_preset(&self, name: &str) -> Result<(), StorageError>;
    fn load_palette_preset(&self) -> Option<String>;

    fn save_canvas_snapshot(&self, encoded: &str) -> Result<(), StorageError>;
    fn load_canvas_snapshot(&self) -> Option<String>;

    /// Remove everything this gateway stored
    fn clear_all(&self) -> Result<(), StorageError>;
}

/// String key-value backend
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, insertion ordered
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<IndexMap<String, String>>,
    read_only: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with `StorageError::Unavailable`
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.write() = read_only;
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if *self.read_only.read() {
            return Err(StorageError::Unavailable("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.values.write().shift_remove(key);
        Ok(())
    }
}

/// One file per key under a directory; writes go through a temp file
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the application data directory
    pub fn default_location() -> Self {
        Self::new(crate::config::EngineConfig::data_dir().join("storage"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::Unavailable(format!("invalid key {:?}", key)));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keys used by [`PaletteStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub canvas: String,
    pub palette: String,
    pub brush: String,
    pub history: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            canvas: "mixpaint_canvas_v1".to_string(),
            palette: "mixpaint_palette_preset".to_string(),
            brush: "mixpaint_brush_settings".to_string(),
            history: "mixpaint_history".to_string(),
        }
    }
}

/// Persistence gateway over a key-value store
pub struct PaletteStorage<S: KeyValueStore> {
    store: Arc<S>,
    keys: StorageKeys,
}

impl<S: KeyValueStore> PaletteStorage<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_keys(store, StorageKeys::default())
    }

    pub fn with_keys(store: Arc<S>, keys: StorageKeys) -> Self {
        Self { store, keys }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("[Storage] Failed to read {}: {}", key, e);
                None
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = self.read(key)?;
        match serde_json::from_str::<T>(&text).map_err(DecodeError::from) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("[Storage] Ignoring corrupt {}: {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.store.set(key, value)?;
        tracing::debug!("[Storage] Saved {} ({} bytes)", key, value.len());
        Ok(())
    }
}

impl<S: KeyValueStore> PersistenceGateway for PaletteStorage<S> {
    fn save_history(&self, snapshot: &HistorySnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot)?;
        self.write(&self.keys.history, &json)
    }

    fn load_history(&self) -> Option<HistorySnapshot> {
        self.read_json(&self.keys.history)
    }

    fn save_brush_settings(&self, settings: &BrushSettings) -> Result<(), StorageError> {
        let json = serde_json::to_string(settings)?;
        self.write(&self.keys.brush, &json)
    }

    fn load_brush_settings(&self) -> Option<BrushSettings> {
        self.read_json(&self.keys.brush)
    }

    fn save_palette_preset(&self, name: &str) -> Result<(), StorageError> {
        self.write(&self.keys.palette, name)
    }

    fn load_palette_preset(&self) -> Option<String> {
        self.read(&self.keys.palette)
    }

    fn save_canvas_snapshot(&self, encoded: &str) -> Result<(), StorageError> {
        self.write(&self.keys.canvas, encoded)
    }

    fn load_canvas_snapshot(&self) -> Option<String> {
        self.read(&self.keys.canvas)
    }

    fn clear_all(&self) -> Result<(), StorageError> {
        for key in [
            &self.keys.canvas,
            &self.keys.palette,
            &self.keys.brush,
            &self.keys.history,
        ] {
            self.store.remove(key)?;
        }
        tracing::info!("[Storage] Cleared all saved data");
        Ok(())
    }
}
