use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::GenerationSettings;

/// Storage key holding the serialized [`GenerationSettings`].
pub const SETTINGS_KEY: &str = "genai-settings";

/// Storage key flagging that the onboarding overlay has been dismissed.
pub const ONBOARDING_KEY: &str = "genai-onboarding-seen";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence port: string values under fixed keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// --- File-backed store ---

/// Resolve the default data directory (~/.easel/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".easel")
}

/// One JSON file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(data_dir())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    /// Atomic write (temp file + rename) so a crash mid-write leaves the
    /// previous value intact.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, self.path_for(key)).map_err(io_err)
    }
}

// --- In-memory store ---

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// --- Settings store ---

/// Loads and saves [`GenerationSettings`] through a [`KeyValueStore`].
pub struct SettingsStore<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Read persisted settings. Missing or malformed data yields the default.
    pub fn load(&self) -> GenerationSettings {
        let Some(raw) = self.store.get(SETTINGS_KEY) else {
            return GenerationSettings::default();
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "stored generation settings unreadable, using defaults");
                GenerationSettings::default()
            }
        }
    }

    /// Persist the whole settings object. Failures are logged, never returned.
    pub fn save(&self, settings: &GenerationSettings) {
        if let Err(e) = self.try_save(settings) {
            tracing::warn!(error = %e, "failed to persist generation settings");
        }
    }

    pub fn try_save(&self, settings: &GenerationSettings) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(settings)?;
        self.store.set(SETTINGS_KEY, &json)
    }

    pub fn has_seen_onboarding(&self) -> bool {
        self.store.get(ONBOARDING_KEY).as_deref().map(str::trim) == Some("true")
    }

    pub fn mark_onboarding_seen(&self) {
        if let Err(e) = self.store.set(ONBOARDING_KEY, "true") {
            tracing::warn!(error = %e, "failed to persist onboarding flag");
        }
    }
}
