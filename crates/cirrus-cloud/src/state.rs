//! Local state store
//!
//! Persists the reconciled view of every managed resource in
//! `.cirrus/state.json` so the next read can preserve the user's ordering.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".cirrus";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";
const STALE_LOCK_HOURS: i64 = 1;

/// Kind of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    NetworkArea,
    Image,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::NetworkArea => write!(f, "network_area"),
            ResourceKind::Image => write!(f, "image"),
        }
    }
}

/// Address of a resource in the state file, e.g. `network_area.main`
pub fn address(kind: ResourceKind, name: &str) -> String {
    format!("{}.{}", kind, name)
}

/// Persisted state of all managed resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    /// Records by address; BTreeMap keeps the file diff-friendly
    pub resources: BTreeMap<String, ResourceRecord>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<&ResourceRecord> {
        self.resources.get(address)
    }

    pub fn upsert(&mut self, address: String, record: ResourceRecord) {
        self.resources.insert(address, record);
        self.updated_at = Utc::now();
    }

    pub fn remove(&mut self, address: &str) -> Option<ResourceRecord> {
        let removed = self.resources.remove(address);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn by_kind(&self, kind: ResourceKind) -> impl Iterator<Item = (&String, &ResourceRecord)> {
        self.resources.iter().filter(move |(_, r)| r.kind == kind)
    }
}

/// State of one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub kind: ResourceKind,

    /// Remote id of the resource
    pub remote_id: String,

    /// Mapped attributes (reconciled lists, resolved names, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(kind: ResourceKind, remote_id: impl Into<String>) -> Self {
        Self {
            kind,
            remote_id: remote_id.into(),
            attributes: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Store a serializable attribute
    pub fn with_attribute<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self> {
        self.attributes
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Read a typed attribute. A present but malformed value is an error.
    pub fn attribute<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.attributes
            .get(key)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(CloudError::from)
    }
}

/// Reads and writes the state file under a project root
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !fs::try_exists(&dir).await? {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the state; a missing file is an empty state
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !fs::try_exists(&path).await? {
            tracing::debug!("No state file at {}, starting empty", path.display());
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "state file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resource(s)", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        if fs::try_exists(&path).await? {
            fs::rename(&path, self.backup_path()).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resource(s)", state.resources.len());
        Ok(())
    }

    /// Acquire the state lock. Locks older than an hour are taken over.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;
        let lock_path = self.lock_path();

        if fs::try_exists(&lock_path).await? {
            let content = fs::read_to_string(&lock_path).await?;
            let held: LockInfo = serde_json::from_str(&content)?;

            let age = Utc::now().signed_duration_since(held.acquired_at);
            if age.num_hours() < STALE_LOCK_HOURS {
                return Err(CloudError::LockError(format!(
                    "state is locked by {} (pid {}) since {}",
                    held.holder, held.pid, held.acquired_at
                )));
            }

            tracing::warn!("Taking over stale state lock from {}", held.holder);
        }

        let info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        fs::write(&lock_path, serde_json::to_string_pretty(&info)?).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held state lock; removed on release or drop
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if fs::try_exists(&self.lock_path).await? {
            fs::remove_file(&self.lock_path).await?;
            tracing::debug!("Released state lock");
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
