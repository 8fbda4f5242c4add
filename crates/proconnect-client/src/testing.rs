use async_trait::async_trait;
use proconnect_store::{
    RealtimeStore, Result, StoreError, StorePath, Subscription, SubscriptionId,
};
use serde_json::{Map, Value};

pub struct FailingStore;

fn denied() -> StoreError {
    StoreError::PermissionDenied("denied by test double".into())
}

#[async_trait]
impl RealtimeStore for FailingStore {
    async fn read(&self, _path: &StorePath) -> Result<Option<Value>> {
        Err(denied())
    }

    async fn write(&self, _path: &StorePath, _value: Value) -> Result<()> {
        Err(denied())
    }

    async fn update(&self, _path: &StorePath, _fields: Map<String, Value>) -> Result<()> {
        Err(denied())
    }

    async fn remove(&self, _path: &StorePath) -> Result<()> {
        Err(denied())
    }

    fn push_key(&self) -> String {
        "-failing-store-key".to_string()
    }

    async fn create_if_absent(&self, _path: &StorePath, _value: Value) -> Result<bool> {
        Err(denied())
    }

    async fn query_by_field(
        &self,
        _collection: &StorePath,
        _field: &str,
        _equals: &Value,
    ) -> Result<Map<String, Value>> {
        Err(denied())
    }

    async fn subscribe(&self, _path: &StorePath) -> Result<Subscription> {
        Err(denied())
    }

    fn unsubscribe(&self, _id: SubscriptionId) {}
}
