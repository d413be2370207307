//! The state cache: the latest readables and actions synced by the front end.
//!
//! The cache is a single slot. Every sync builds a fresh [`Snapshot`] and swaps
//! the slot's `Arc`; nothing is merged and no history is kept. Readers clone
//! the `Arc` and keep working on that snapshot even if a sync lands while they
//! are still talking to the provider. There is no generation counter, so a
//! reader cannot tell whether its snapshot has since been replaced.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::catalog::{Action, Readable};

/// An immutable view of both catalogs, as of one sync.
///
/// Also the `/sync` request body: an omitted or `null` catalog is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub readables: Vec<Readable>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub actions: Vec<Action>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Snapshot {
    pub fn new(readables: Vec<Readable>, actions: Vec<Action>) -> Self {
        Self { readables, actions }
    }

    pub fn is_empty(&self) -> bool {
        self.readables.is_empty() && self.actions.is_empty()
    }
}

/// Process-wide, single-slot holder of the current [`Snapshot`].
///
/// Last writer wins. The lock is only held for the pointer swap or clone,
/// never across an await point.
#[derive(Debug, Default)]
pub struct StateCache {
    current: RwLock<Arc<Snapshot>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both catalogs unconditionally and return the new snapshot.
    pub fn sync(&self, readables: Vec<Readable>, actions: Vec<Action>) -> Arc<Snapshot> {
        self.replace(Snapshot::new(readables, actions))
    }

    /// Replace the cached snapshot wholesale.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        debug!(
            readables = snapshot.readables.len(),
            actions = snapshot.actions.len(),
            "State cache replaced"
        );
        let snapshot = Arc::new(snapshot);
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        *slot = snapshot.clone();
        snapshot
    }

    /// The snapshot current at the moment of the call.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
