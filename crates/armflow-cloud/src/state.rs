//! Resource state records
//!
//! [`ResourceState`] is what a read flattens remote state into. An empty id
//! means the resource is gone and should be dropped from tracking.
//! [`StateStore`] keeps tracked records in `.armflow/state.json`.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".armflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";

/// Flattened state of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource id; empty once the resource has been removed remotely
    pub id: String,

    /// Resource type name (e.g. `azurerm_subnet`)
    pub resource_type: String,

    pub attributes: BTreeMap<String, serde_json::Value>,

    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: BTreeMap::new(),
            refreshed_at: None,
        }
    }

    /// Mark the resource as gone
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn is_removed(&self) -> bool {
        self.id.is_empty()
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.attributes
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn touch(&mut self) {
        self.refreshed_at = Some(Utc::now());
    }
}

/// Contents of the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    /// Records keyed by `type:id`
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn key(state: &ResourceState) -> String {
        format!("{}:{}", state.resource_type, state.id)
    }

    pub fn track(&mut self, state: ResourceState) {
        self.resources.insert(Self::key(&state), state);
        self.updated_at = Utc::now();
    }

    pub fn untrack(&mut self, key: &str) -> Option<ResourceState> {
        let removed = self.resources.remove(key);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }
}

/// Reads and writes the state file under a project root
pub struct StateStore {
    project_root: PathBuf,
}

impl StateStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_path(&self) -> PathBuf {
        self.project_root.join(STATE_DIR).join(STATE_FILE)
    }

    pub async fn load(&self) -> Result<StateFile> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, starting empty");
            return Ok(StateFile::default());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StateFile = serde_json::from_str(&content)?;
        if state.version > STATE_VERSION {
            return Err(CloudError::InvalidConfig(format!(
                "state file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Write the state, keeping the previous file as a backup
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        let dir = self.project_root.join(STATE_DIR);
        fs::create_dir_all(&dir).await?;

        let path = self.state_path();
        if path.exists() {
            fs::rename(&path, dir.join(STATE_BACKUP)).await?;
        }

        fs::write(&path, serde_json::to_string_pretty(state)?).await?;
        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }
}
