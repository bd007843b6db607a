//! Ordered-set reconciliation
//!
//! The remote API returns collections (network ranges, nameservers, host
//! lists) in storage order, while the user declared them in a meaningful
//! order. These helpers rebuild the local view from a fresh remote listing:
//! keys still present keep their local relative order, keys the remote no
//! longer reports are dropped, and keys seen only remotely are appended in
//! response order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rebuild the local ordering of `local_order` against `remote_set`.
///
/// The result contains exactly the keys of `remote_set`, without
/// duplicates. Retained keys come first in local order, new keys follow in
/// remote order.
pub fn reconcile_order<L, R>(local_order: &[L], remote_set: &[R]) -> Vec<String>
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    let remote: HashSet<&str> = remote_set.iter().map(AsRef::<str>::as_ref).collect();

    let mut emitted: HashSet<&str> = HashSet::with_capacity(remote.len());
    let mut result = Vec::with_capacity(remote.len());

    for key in local_order.iter().map(AsRef::<str>::as_ref) {
        if remote.contains(key) && emitted.insert(key) {
            result.push(key.to_string());
        }
    }

    for key in remote_set.iter().map(AsRef::<str>::as_ref) {
        if emitted.insert(key) {
            result.push(key.to_string());
        }
    }

    result
}

/// An item reported by the remote system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Natural key (CIDR prefix, nameserver address, ...)
    pub key: String,
    /// Opaque id assigned by the remote system
    pub remote_id: String,
}

impl RemoteItem {
    pub fn new(key: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            remote_id: remote_id.into(),
        }
    }
}

/// An item of the reconciled local view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledItem {
    pub key: String,
    pub remote_id: String,
}

/// Keyed variant of [`reconcile_order`] that carries remote ids into the
/// reconciled view.
pub fn reconcile_items<L>(local_order: &[L], remote_items: &[RemoteItem]) -> Vec<ReconciledItem>
where
    L: AsRef<str>,
{
    let remote_keys: Vec<&str> = remote_items.iter().map(|i| i.key.as_str()).collect();

    reconcile_order(local_order, &remote_keys)
        .into_iter()
        .filter_map(|key| {
            // first occurrence wins if the remote reported a key twice
            remote_items
                .iter()
                .find(|item| item.key == key)
                .map(|item| ReconciledItem {
                    remote_id: item.remote_id.clone(),
                    key,
                })
        })
        .collect()
}
