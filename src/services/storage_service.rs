use anyhow::{anyhow, Context, Result};
use log::debug;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STORE_FILE_NAME: &str = "storage.json";

/// Key/value persistence used for the tracked streamers, the poll interval
/// and the notification id -> channel records.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Resolve (and create) the streamwatch data directory in the local app data folder.
pub fn get_app_data_dir(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    let app_dir = match override_dir {
        Some(dir) => dir,
        None => {
            let base = dirs::data_local_dir()
                .ok_or_else(|| anyhow!("Could not find local data directory"))?;
            // Keep development runs away from the real tracked list
            if cfg!(debug_assertions) {
                base.join("streamwatch.dev")
            } else {
                base.join("streamwatch")
            }
        }
    };

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir).context("Failed to create streamwatch directory")?;
    }

    Ok(app_dir)
}

/// All keys live in a single JSON object on disk.
///
/// Every operation re-reads the file, so a `watch` console and one-shot CLI
/// invocations observe each other's writes. Writes go to a temp file that is
/// renamed over the original, which makes each `set` an atomic replace.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(app_dir: &Path) -> Result<Self> {
        let store = Self {
            path: app_dir.join(STORE_FILE_NAME),
            write_lock: Mutex::new(()),
        };
        // Fail early on a corrupt file instead of on the first poll
        store.read_all()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).context("Failed to write storage file")?;
        fs::rename(&tmp_path, &self.path).context("Failed to replace storage file")?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) -> bool,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Storage lock poisoned"))?;
        let mut entries = self.read_all()?;
        if apply(&mut entries) {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        debug!("[Storage] set {}", key);
        self.update(|entries| {
            entries.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        debug!("[Storage] remove {}", key);
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
pub use memory::MemoryStore;


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.get("streamers").unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_get_remove_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.set("checkInterval", json!(45)).unwrap();
        store.set("notification_abc", json!("shroud")).unwrap();

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("checkInterval").unwrap(), Some(json!(45)));

        reopened.remove("notification_abc").unwrap();
        assert!(store.get("notification_abc").unwrap().is_none());
        assert_eq!(store.get("checkInterval").unwrap(), Some(json!(45)));
    }

    #[test]
    fn test_removing_absent_key_does_not_touch_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.remove("nothing").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE_NAME), "{not json").unwrap();
        assert!(JsonFileStore::open(dir.path()).is_err());
    }
}
