//! Create/delete diff planning for keyed remote collections
//!
//! Given the desired natural keys and the items currently reported by the
//! remote system, every key lands in exactly one [`KeyState`]. Keys that
//! exist only remotely are deleted, keys that exist only in the
//! configuration are created, and everything else is left alone.
//!
//! Applying a plan fetches the remote collection once, runs the deletion
//! pass, then the creation pass. The first failing mutation aborts the
//! run; mutations already committed stay committed. Re-running the same
//! reconciliation converges because the next fetch observes them.

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::error::{CloudError, Result};
use crate::reconcile::RemoteItem;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Remote gateway seam for one keyed collection
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Resource type used in plans and log lines (e.g. "network-range")
    fn resource_type(&self) -> &str;

    /// List the items currently present remotely
    async fn fetch(&self) -> Result<Vec<RemoteItem>>;

    /// Create the item identified by `key`
    async fn create(&self, key: &str) -> Result<()>;

    /// Delete the item with the given remote id
    async fn delete(&self, remote_id: &str) -> Result<()>;
}

/// Reconciliation state of a single key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyState {
    /// Neither side has marked the key yet
    #[default]
    Unknown,
    /// Declared, not present remotely
    DesiredOnly,
    /// Present remotely, no longer declared
    RemoteOnly { remote_id: String },
    /// Declared and present remotely
    Both { remote_id: String },
}

impl KeyState {
    fn mark_desired(self) -> Self {
        match self {
            KeyState::Unknown | KeyState::DesiredOnly => KeyState::DesiredOnly,
            KeyState::RemoteOnly { remote_id } | KeyState::Both { remote_id } => {
                KeyState::Both { remote_id }
            }
        }
    }

    fn mark_remote(self, remote_id: String) -> Self {
        match self {
            KeyState::Unknown => KeyState::RemoteOnly { remote_id },
            KeyState::DesiredOnly => KeyState::Both { remote_id },
            // a key reported twice keeps the first id
            state @ (KeyState::RemoteOnly { .. } | KeyState::Both { .. }) => state,
        }
    }

    /// Action required to converge this key
    pub fn action(&self) -> ActionType {
        match self {
            KeyState::DesiredOnly => ActionType::Create,
            KeyState::RemoteOnly { .. } => ActionType::Delete,
            KeyState::Both { .. } | KeyState::Unknown => ActionType::NoOp,
        }
    }

    pub fn remote_id(&self) -> Option<&str> {
        match self {
            KeyState::RemoteOnly { remote_id } | KeyState::Both { remote_id } => {
                Some(remote_id.as_str())
            }
            KeyState::Unknown | KeyState::DesiredOnly => None,
        }
    }
}

/// State table keyed by natural key
#[derive(Debug, Clone, Default)]
pub struct DiffTable {
    entries: BTreeMap<String, KeyState>,
}

impl DiffTable {
    /// Build the table. Duplicate desired keys collapse into one entry.
    pub fn build<S: AsRef<str>>(desired: &[S], remote: &[RemoteItem]) -> Self {
        let mut entries: BTreeMap<String, KeyState> = BTreeMap::new();

        for key in desired {
            let state = entries.remove(key.as_ref()).unwrap_or_default();
            entries.insert(key.as_ref().to_string(), state.mark_desired());
        }

        for item in remote {
            let state = entries.remove(&item.key).unwrap_or_default();
            entries.insert(item.key.clone(), state.mark_remote(item.remote_id.clone()));
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&KeyState> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyState)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys to delete, with their remote ids
    pub fn deletions(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(key, state)| match state {
                KeyState::RemoteOnly { remote_id } => Some((key.as_str(), remote_id.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Keys to create
    pub fn creations(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, state)| state.action() == ActionType::Create)
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Render the table as a plan, deletions first
    pub fn to_plan(&self, resource_type: &str) -> Plan {
        let mut actions: Vec<Action> = self
            .deletions()
            .into_iter()
            .map(|(key, remote_id)| Action::delete(resource_type, key, remote_id))
            .collect();

        actions.extend(
            self.creations()
                .into_iter()
                .map(|key| Action::create(resource_type, key)),
        );

        actions.extend(
            self.entries
                .iter()
                .filter(|(_, state)| state.action() == ActionType::NoOp)
                .map(|(key, state)| Action::no_op(resource_type, key, state.remote_id())),
        );

        Plan::new(actions)
    }
}

/// Fetch the collection and compute the plan without mutating anything
pub async fn plan_collection<C, S>(collection: &C, desired: &[S]) -> Result<Plan>
where
    C: RemoteCollection + ?Sized,
    S: AsRef<str> + Sync,
{
    let remote = collection
        .fetch()
        .await
        .map_err(|e| CloudError::RemoteFetch(Box::new(e)))?;

    Ok(DiffTable::build(desired, &remote).to_plan(collection.resource_type()))
}

/// Converge the remote collection onto `desired`.
///
/// Fetches once, deletes `RemoteOnly` keys, then creates `DesiredOnly`
/// keys. Aborts with [`CloudError::PartialMutation`] on the first failing
/// mutation; no retries and no rollback.
pub async fn reconcile_collection<C, S>(collection: &C, desired: &[S]) -> Result<ApplyResult>
where
    C: RemoteCollection + ?Sized,
    S: AsRef<str> + Sync,
{
    let start = std::time::Instant::now();
    let resource_type = collection.resource_type().to_string();

    let remote = collection
        .fetch()
        .await
        .map_err(|e| CloudError::RemoteFetch(Box::new(e)))?;

    let table = DiffTable::build(desired, &remote);
    tracing::debug!(
        "Reconciling {} {} key(s) against {} remote item(s)",
        table.len(),
        resource_type,
        remote.len()
    );

    let mut result = ApplyResult::new();

    for (key, remote_id) in table.deletions() {
        tracing::info!("Deleting {} {} (ID: {})", resource_type, key, remote_id);

        if let Err(e) = collection.delete(remote_id).await {
            return Err(CloudError::PartialMutation {
                action: ActionType::Delete,
                key: key.to_string(),
                completed: result.completed_ids(),
                source: Box::new(e),
            });
        }
        result.add_success(
            format!("delete-{}", key),
            format!("deleted {} {}", resource_type, key),
        );
    }

    for key in table.creations() {
        tracing::info!("Creating {} {}", resource_type, key);

        if let Err(e) = collection.create(key).await {
            return Err(CloudError::PartialMutation {
                action: ActionType::Create,
                key: key.to_string(),
                completed: result.completed_ids(),
                source: Box::new(e),
            });
        }
        result.add_success(
            format!("create-{}", key),
            format!("created {} {}", resource_type, key),
        );
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}
