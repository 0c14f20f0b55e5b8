//! State file
//!
//! Persists [`ResourceData`] per named resource between CLI runs.

use crate::schema::ResourceData;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub resource_type: String,
    pub data: ResourceData,
    /// Last time the entry was written from a server response
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub resources: BTreeMap<String, StateEntry>,
}

impl StateFile {
    /// Load state from `path`. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state {}", path.display()))
    }

    /// Write state to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write state {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StateEntry> {
        self.resources.get(name)
    }

    /// Record `data` under `name`; objects that no longer exist are dropped
    pub fn put(&mut self, name: &str, resource_type: &str, data: ResourceData) {
        if !data.exists() {
            self.resources.remove(name);
            return;
        }
        self.resources.insert(
            name.to_string(),
            StateEntry {
                resource_type: resource_type.to_string(),
                data,
                refreshed_at: Utc::now(),
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<StateEntry> {
        self.resources.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut data = ResourceData::default();
        data.set_id("abc");
        data.set("body", r#"{"name":"d"}"#);

        let mut state = StateFile::default();
        state.put("main", "elasticsearch_opendistro_detector", data.clone());
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.get("main").unwrap().data, data);
    }

    #[test]
    fn test_put_without_id_removes_entry() {
        let mut data = ResourceData::default();
        data.set_id("abc");

        let mut state = StateFile::default();
        state.put("main", "t", data.clone());
        assert!(state.get("main").is_some());

        data.set_id("");
        state.put("main", "t", data);
        assert!(state.get("main").is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::load(&dir.path().join("none.json")).unwrap();
        assert!(state.resources.is_empty());
    }
}
