//! Stack state persistence
//!
//! Each stack is saved to `{root}/{state_dir}/stacks/{stack}.json`, with the
//! previous version kept as `{stack}.json.backup` and an advisory lock file
//! next to it.

use crate::error::{CloudError, Result};
use crate::output::OutputMap;
use crate::resource::{ResourceOptions, ResourceRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
pub const DEFAULT_STATE_DIR: &str = ".stackcraft";
const STACKS_DIR: &str = "stacks";
const STALE_LOCK_HOURS: i64 = 1;

/// Saved state of one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by URN
    pub resources: BTreeMap<String, ResourceState>,

    /// Outputs of the last successful run
    #[serde(default)]
    pub outputs: OutputMap,
}

impl Default for StackState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
            outputs: OutputMap::new(),
        }
    }
}

impl StackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the saved resources and outputs with those of a finished run
    pub fn record_run(&mut self, resources: &[ResourceRef], outputs: OutputMap) {
        let now = Utc::now();
        let mut next = BTreeMap::new();

        for (order, resource) in resources.iter().enumerate() {
            let created_at = self
                .resources
                .get(&resource.urn)
                .map(|saved| saved.created_at)
                .unwrap_or(now);
            next.insert(
                resource.urn.clone(),
                ResourceState::from_ref(resource, order, created_at, now),
            );
        }

        self.resources = next;
        self.outputs = outputs;
        self.updated_at = now;
    }

    /// Forget every resource and output
    pub fn clear(&mut self) {
        self.resources.clear();
        self.outputs = OutputMap::new();
        self.updated_at = Utc::now();
    }

    /// Resources in the order they were registered
    pub fn ordered(&self) -> Vec<(&String, &ResourceState)> {
        let mut entries: Vec<_> = self.resources.iter().collect();
        entries.sort_by_key(|(_, r)| r.order);
        entries
    }

    pub fn get_resource(&self, urn: &str) -> Option<&ResourceState> {
        self.resources.get(urn)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Physical id
    pub id: String,

    pub type_token: String,

    /// Logical name
    pub name: String,

    /// Registration position within the run
    pub order: usize,

    /// Arguments with secrets redacted
    pub args: serde_json::Value,

    #[serde(default)]
    pub options: ResourceOptions,

    /// When the resource was first recorded
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    fn from_ref(
        resource: &ResourceRef,
        order: usize,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: resource.id.clone(),
            type_token: resource.type_token.clone(),
            name: resource.name.clone(),
            order,
            args: resource.args.clone(),
            options: resource.options.clone(),
            created_at,
            updated_at,
        }
    }
}

/// State manager for reading/writing stack state files
pub struct StateManager {
    /// Directory holding the `stacks/` folder
    state_dir: PathBuf,
    stack: String,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>, stack: impl Into<String>) -> Self {
        Self::with_state_dir(project_root.as_ref().join(DEFAULT_STATE_DIR), stack)
    }

    pub fn with_state_dir(state_dir: impl Into<PathBuf>, stack: impl Into<String>) -> Self {
        Self {
            state_dir: state_dir.into(),
            stack: stack.into(),
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    fn stacks_dir(&self) -> PathBuf {
        self.state_dir.join(STACKS_DIR)
    }

    /// Get the state file path
    pub fn state_path(&self) -> PathBuf {
        self.stacks_dir().join(format!("{}.json", self.stack))
    }

    fn backup_path(&self) -> PathBuf {
        self.stacks_dir().join(format!("{}.json.backup", self.stack))
    }

    fn lock_path(&self) -> PathBuf {
        self.stacks_dir().join(format!("{}.lock", self.stack))
    }

    async fn ensure_stacks_dir(&self) -> Result<()> {
        let dir = self.stacks_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state, empty when the stack was never saved
    pub async fn load(&self) -> Result<StackState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("No state for stack {}, starting empty", self.stack);
            return Ok(StackState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StackState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &StackState) -> Result<()> {
        self.ensure_stacks_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!(
            "Saved stack {} with {} resources",
            self.stack,
            state.resources.len()
        );
        Ok(())
    }

    /// Acquire a lock for exclusive access to this stack
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_stacks_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < STALE_LOCK_HOURS {
                return Err(CloudError::LockError(format!(
                    "Stack {} is locked by {} since {}",
                    self.stack, lock_info.holder, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired lock for stack {}", self.stack);
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }

    /// Re-read, modify and save the state while holding the stack lock
    ///
    /// The lock is released whether or not the load or save succeeds.
    pub async fn update<F>(&self, apply: F) -> Result<StackState>
    where
        F: FnOnce(&mut StackState),
    {
        let lock = self.acquire_lock().await?;
        let updated = self.load_apply_save(apply).await;
        let released = lock.release().await;

        let state = updated?;
        released?;
        Ok(state)
    }

    async fn load_apply_save<F>(&self, apply: F) -> Result<StackState>
    where
        F: FnOnce(&mut StackState),
    {
        let mut state = self.load().await?;
        apply(&mut state);
        self.save(&state).await?;
        Ok(state)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for a stack lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn bucket() -> ResourceRef {
        ResourceRef {
            urn: "urn:stackcraft:dev::web::cloudflare:index/r2Bucket:R2Bucket::bucket".into(),
            id: "test-bucket".into(),
            type_token: "cloudflare:index/r2Bucket:R2Bucket".into(),
            name: "bucket".into(),
            args: json!({ "name": "test-bucket", "location": "WEUR" }),
            outputs: json!({}),
            options: ResourceOptions::new(),
        }
    }

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path(), "dev");

        let mut outputs = OutputMap::new();
        outputs.insert("bucket_name", "test-bucket").unwrap();
        let mut state = StackState::new();
        state.record_run(&[bucket()], outputs);

        manager.save(&state).await.unwrap();
        assert!(temp_dir.path().join(".stackcraft/stacks/dev.json").exists());

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(loaded.outputs.get_str("bucket_name"), Some("test-bucket"));
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path(), "prod");

        let state = manager.load().await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_second_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path(), "dev");

        manager.save(&StackState::new()).await.unwrap();
        manager.save(&StackState::new()).await.unwrap();

        assert!(temp_dir.path().join(".stackcraft/stacks/dev.json.backup").exists());
    }

    #[tokio::test]
    async fn test_created_at_survives_rerun() {
        let mut state = StackState::new();
        state.record_run(&[bucket()], OutputMap::new());
        let first = state.resources.values().next().unwrap().created_at;

        state.record_run(&[bucket()], OutputMap::new());
        assert_eq!(state.resources.values().next().unwrap().created_at, first);
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path(), "dev");

        let lock = manager.acquire_lock().await.unwrap();
        assert!(matches!(
            manager.acquire_lock().await,
            Err(CloudError::LockError(_))
        ));

        lock.release().await.unwrap();
        let again = manager.acquire_lock().await.unwrap();
        drop(again);
        assert!(!temp_dir.path().join(".stackcraft/stacks/dev.lock").exists());
    }

    #[tokio::test]
    async fn test_update_records_under_lock() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path(), "dev");

        let state = manager
            .update(|state| state.record_run(&[bucket()], OutputMap::new()))
            .await
            .unwrap();
        assert_eq!(state.resources.len(), 1);
        assert_eq!(manager.load().await.unwrap().resources.len(), 1);
        assert!(!manager.lock_path().exists());
    }

    #[tokio::test]
    async fn test_update_releases_lock_when_save_fails() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path(), "dev");
        manager.save(&StackState::new()).await.unwrap();

        // A non-empty directory where the backup goes makes the save fail
        let backup = manager.backup_path();
        std::fs::create_dir_all(backup.join("blocked")).unwrap();

        let result = manager
            .update(|state| state.record_run(&[bucket()], OutputMap::new()))
            .await;
        assert!(result.is_err());
        assert!(!manager.lock_path().exists());

        let lock = manager.acquire_lock().await.unwrap();
        lock.release().await.unwrap();
    }
}
