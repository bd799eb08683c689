//! Persisted key-value storage for setting values.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::settings::SettingValue;

/// Named values persisted across sessions.
pub trait SettingsStore {
    /// Value stored under `key`, if any.
    fn read(&self, key: &str) -> Option<SettingValue>;

    /// Store `value` under `key`.
    fn write(&mut self, key: &str, value: SettingValue) -> Result<(), ConfigError>;

    /// Forget the value stored under `key`.
    fn remove(&mut self, key: &str) -> Result<(), ConfigError>;
}

/// Store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, SettingValue>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn read(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: SettingValue) -> Result<(), ConfigError> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store backed by a flat TOML table on disk. Every change is written through.
#[derive(Debug, Clone)]
pub struct TomlStore {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
}

impl TomlStore {
    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?
        } else {
            info!(path = %path.display(), "Settings file not found, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_owned(),
            values,
        })
    }

    /// File this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `values` to disk, then adopt them. On error nothing changes.
    fn commit(&mut self, values: BTreeMap<String, SettingValue>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(&values)?;
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.path, content).map_err(io_err)?;
        debug!(path = %self.path.display(), entries = values.len(), "Saved settings");
        self.values = values;
        Ok(())
    }
}

impl SettingsStore for TomlStore {
    fn read(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: SettingValue) -> Result<(), ConfigError> {
        let mut values = self.values.clone();
        values.insert(key.to_owned(), value);
        self.commit(values)
    }

    fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }
        let mut values = self.values.clone();
        values.remove(key);
        self.commit(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.read("pref_camera_hdr_key"), None);

        store
            .write("pref_camera_hdr_key", SettingValue::Bool(true))
            .expect("write should succeed");
        assert_eq!(store.read("pref_camera_hdr_key"), Some(SettingValue::Bool(true)));

        store.remove("pref_camera_hdr_key").expect("remove should succeed");
        assert_eq!(store.read("pref_camera_hdr_key"), None);
    }

    #[test]
    fn test_toml_store_persists_across_open() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("nested").join("settings.toml");

        let mut store = TomlStore::open(&path).expect("open should succeed");
        store
            .write("pref_camera_flashmode_key", SettingValue::Text("on".to_owned()))
            .expect("write should succeed");
        store
            .write("pref_camera_exposure_key", SettingValue::Int(-2))
            .expect("write should succeed");
        store
            .write("pref_camera_grid_lines", SettingValue::Bool(true))
            .expect("write should succeed");

        let reopened = TomlStore::open(&path).expect("reopen should succeed");
        assert_eq!(
            reopened.read("pref_camera_flashmode_key"),
            Some(SettingValue::Text("on".to_owned()))
        );
        assert_eq!(reopened.read("pref_camera_exposure_key"), Some(SettingValue::Int(-2)));
        assert_eq!(reopened.read("pref_camera_grid_lines"), Some(SettingValue::Bool(true)));
    }

    #[test]
    fn test_toml_store_failed_write_leaves_values_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").expect("write should succeed");

        let mut store =
            TomlStore::open(&blocker.join("settings.toml")).expect("open should succeed");
        let result = store.write("pref_camera_hdr_key", SettingValue::Bool(true));

        assert!(matches!(result, Err(ConfigError::Io { .. })));
        assert_eq!(store.read("pref_camera_hdr_key"), None);
    }

    #[test]
    fn test_toml_store_failed_remove_keeps_value() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("settings.toml");
        let mut store = TomlStore::open(&path).expect("open should succeed");
        store
            .write("pref_camera_hdr_key", SettingValue::Bool(true))
            .expect("write should succeed");

        // Replace the file with a directory so the next save fails.
        std::fs::remove_file(&path).expect("remove should succeed");
        std::fs::create_dir(&path).expect("create_dir should succeed");

        assert!(store.remove("pref_camera_hdr_key").is_err());
        assert_eq!(store.read("pref_camera_hdr_key"), Some(SettingValue::Bool(true)));
    }

    #[test]
    fn test_toml_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "this is = = not toml").expect("write should succeed");

        let result = TomlStore::open(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
