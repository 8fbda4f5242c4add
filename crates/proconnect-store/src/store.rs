//! The realtime store collaborator as seen by the client core.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;
use crate::path::StorePath;

// ---------------------------------------------------------------------------
// Subscription types
// ---------------------------------------------------------------------------

/// Identifies one live subscription for [`RealtimeStore::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification that the subtree under a subscription may have changed.
///
/// Consumers re-read the subscribed path; the event only says where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The location that was written, which overlaps the subscribed path.
    pub path: StorePath,
}

/// A live subscription returned by [`RealtimeStore::subscribe`].
///
/// The first event announces the current state; each later event follows a
/// change.  The channel closes when the subscription ends for any reason.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub path: StorePath,
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// A path-addressable realtime JSON tree.
///
/// Absent nodes and `null` are the same thing, and a node without children
/// does not exist.  No operation retries on failure.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// One-shot read of the whole subtree at `path`.
    async fn read(&self, path: &StorePath) -> Result<Option<Value>>;

    /// Replace the subtree at `path`.  Writing `null` removes it.
    async fn write(&self, path: &StorePath, value: Value) -> Result<()>;

    /// Merge `fields` into the node at `path`.
    ///
    /// Keys may be relative multi-segment paths (`"messages/<key>"`); the
    /// whole map is applied atomically or not at all.
    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()>;

    /// Delete the subtree at `path`.
    async fn remove(&self, path: &StorePath) -> Result<()>;

    /// Generate a new unique, chronologically sortable child key.
    fn push_key(&self) -> String;

    /// Write `value` at `path` only if nothing exists there yet.
    ///
    /// Returns `false` when another writer got there first.
    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool>;

    /// Children of `collection` whose `field` equals `equals`, keyed by child key.
    async fn query_by_field(
        &self,
        collection: &StorePath,
        field: &str,
        equals: &Value,
    ) -> Result<Map<String, Value>>;

    /// Start a live subscription on the subtree at `path`.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription>;

    /// Detach a subscription.  No event is produced for `id` afterwards.
    fn unsubscribe(&self, id: SubscriptionId);
}
