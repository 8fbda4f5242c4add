use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::path::StorePath;
use crate::push_key::PushKeyGenerator;
use crate::store::{ChangeEvent, RealtimeStore, Subscription, SubscriptionId};
use crate::tree;

struct Subscriber {
    path: StorePath,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

struct Inner {
    root: Value,
    subscribers: HashMap<SubscriptionId, Subscriber>,
}

/// A [`RealtimeStore`] backed by a JSON tree in memory.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    keys: PushKeyGenerator,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_data(Value::Object(Map::new()))
    }

    /// Create a store pre-populated with `root` (pruned of empty nodes).
    pub fn with_data(root: Value) -> Self {
        Self {
            inner: Mutex::new(Inner {
                root: tree::prune(root).unwrap_or_else(|| Value::Object(Map::new())),
                subscribers: HashMap::new(),
            }),
            keys: PushKeyGenerator::new(),
        }
    }

    /// Number of attached subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Full copy of the tree.
    pub fn dump(&self) -> Value {
        self.lock().root.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `mutate` on the tree and notify every subscriber whose subtree
    /// overlaps one of `changed` and actually differs afterwards.
    ///
    /// Notifications are queued while the lock is held, so each subscriber
    /// observes changes in commit order.
    fn mutate<R>(&self, changed: &[StorePath], mutate: impl FnOnce(&mut Value) -> R) -> R {
        let mut inner = self.lock();

        let watched: Vec<(SubscriptionId, StorePath, Option<Value>)> = inner
            .subscribers
            .iter()
            .filter_map(|(id, sub)| {
                let trigger = changed.iter().find(|c| c.overlaps(&sub.path))?;
                Some((*id, trigger.clone(), tree::snapshot(&inner.root, &sub.path)))
            })
            .collect();

        let result = mutate(&mut inner.root);

        let mut closed = Vec::new();
        for (id, trigger, before) in watched {
            let Some(sub) = inner.subscribers.get(&id) else {
                continue;
            };
            if tree::snapshot(&inner.root, &sub.path) == before {
                continue;
            }
            trace!(subscription = %id, path = %trigger, "queueing change event");
            if sub.tx.send(ChangeEvent { path: trigger }).is_err() {
                closed.push(id);
            }
        }
        for id in closed {
            debug!(subscription = %id, "dropping subscription with closed receiver");
            inner.subscribers.remove(&id);
        }

        result
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>> {
        Ok(tree::snapshot(&self.lock().root, path))
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<()> {
        self.mutate(std::slice::from_ref(path), |root| tree::set(root, path, value));
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()> {
        let mut targets = Vec::with_capacity(fields.len());
        for (relative, value) in fields {
            targets.push((path.join(&relative)?, value));
        }
        for (i, (a, _)) in targets.iter().enumerate() {
            if let Some((b, _)) = targets[i + 1..].iter().find(|(b, _)| a.overlaps(b)) {
                return Err(StoreError::InvalidPath(format!(
                    "update paths {a} and {b} overlap"
                )));
            }
        }

        let changed: Vec<StorePath> = targets.iter().map(|(p, _)| p.clone()).collect();
        self.mutate(&changed, |root| {
            for (target, value) in targets {
                tree::set(root, &target, value);
            }
        });
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<()> {
        self.mutate(std::slice::from_ref(path), |root| tree::remove(root, path));
        Ok(())
    }

    fn push_key(&self) -> String {
        self.keys.next_key()
    }

    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool> {
        let created = self.mutate(std::slice::from_ref(path), |root| {
            if tree::get(root, path).is_some() {
                false
            } else {
                tree::set(root, path, value);
                true
            }
        });
        Ok(created)
    }

    async fn query_by_field(
        &self,
        collection: &StorePath,
        field: &str,
        equals: &Value,
    ) -> Result<Map<String, Value>> {
        let inner = self.lock();
        let Some(Value::Object(children)) = tree::get(&inner.root, collection) else {
            return Ok(Map::new());
        };
        Ok(children
            .iter()
            .filter(|(_, child)| child.get(field) == Some(equals))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId::new();

        // Registered under the same lock as the initial event, so a consumer
        // re-reading on that event cannot miss a concurrent write.
        let mut inner = self.lock();
        let _ = tx.send(ChangeEvent { path: path.clone() });
        inner.subscribers.insert(
            id,
            Subscriber {
                path: path.clone(),
                tx,
            },
        );
        drop(inner);
        debug!(subscription = %id, path = %path, "subscribed");

        Ok(Subscription {
            id,
            path: path.clone(),
            events: rx,
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if self.lock().subscribers.remove(&id).is_some() {
            debug!(subscription = %id, "unsubscribed");
        }
    }
}
