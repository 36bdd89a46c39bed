//! Key-value storage for state that survives a reload

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{DashboardError, Result};

/// Opaque string blobs by key
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys live in one JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| DashboardError::Store(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| DashboardError::Store(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value.to_string());
        let raw = serde_json::to_string_pretty(&all)
            .map_err(|e| DashboardError::Store(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DashboardError::Store(e.to_string()))?;
            }
        }
        fs::write(&self.path, raw).map_err(|e| DashboardError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let path = std::env::temp_dir().join(format!("lastmile-store-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let mut store = FileStore::new(&path);
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "[]").unwrap();
        assert_eq!(FileStore::new(&path).get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(FileStore::new(&path).get("b").unwrap().as_deref(), Some("[]"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let path =
            std::env::temp_dir().join(format!("lastmile-corrupt-{}.json", std::process::id()));
        fs::write(&path, "{not json").unwrap();

        let mut store = FileStore::new(&path);
        assert!(matches!(store.get("a"), Err(DashboardError::Store(_))));
        assert!(matches!(store.set("a", "1"), Err(DashboardError::Store(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");

        let _ = fs::remove_file(&path);
    }
}
