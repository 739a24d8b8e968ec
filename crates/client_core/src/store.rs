use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::protocol::{AssetKind, AssetUploaded};
use thiserror::Error;

use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Network,
    NotFound,
    Conflict,
    Decode,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Network, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Conflict, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Decode, message)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub kind: AssetKind,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_collection(&self, resource: &str) -> StoreResult<Vec<Value>>;
    async fn fetch_one(&self, resource: &str, id: &str) -> StoreResult<Value>;
    async fn create(&self, resource: &str, payload: Value) -> StoreResult<Value>;
    async fn update(&self, resource: &str, id: &str, payload: Value) -> StoreResult<Value>;
    async fn upload_asset(&self, upload: AssetUpload) -> StoreResult<AssetUploaded>;
}

pub async fn fetch_all<E: Entity>(store: &dyn RemoteStore) -> StoreResult<Vec<E>> {
    let values = store.fetch_collection(E::RESOURCE).await?;
    decode_list(E::RESOURCE, values)
}

pub async fn fetch_entity<E: Entity>(store: &dyn RemoteStore, id: &str) -> StoreResult<E> {
    let value = store.fetch_one(E::RESOURCE, id).await?;
    decode(E::RESOURCE, value)
}

pub async fn save_entity<E: Entity>(store: &dyn RemoteStore, draft: &E) -> StoreResult<E> {
    let payload = serde_json::to_value(draft).map_err(|err| {
        StoreError::decode(format!("failed to encode {} payload: {err}", E::RESOURCE))
    })?;
    let echoed = match draft.id() {
        Some(id) => store.update(E::RESOURCE, id, payload).await?,
        None => store.create(E::RESOURCE, payload).await?,
    };
    decode(E::RESOURCE, echoed)
}

pub async fn fetch_catalog<C: DeserializeOwned>(
    store: &dyn RemoteStore,
    resource: &str,
) -> StoreResult<Vec<C>> {
    let values = store.fetch_collection(resource).await?;
    decode_list(resource, values)
}

fn decode<T: DeserializeOwned>(resource: &str, value: Value) -> StoreResult<T> {
    serde_json::from_value(value)
        .map_err(|err| StoreError::decode(format!("invalid {resource} payload from server: {err}")))
}

fn decode_list<T: DeserializeOwned>(resource: &str, values: Vec<Value>) -> StoreResult<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).map_err(|err| {
                StoreError::decode(format!(
                    "invalid {resource} payload from server at item {index}: {err}"
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::domain::{Patient, Treatment};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingStore {
        collection: Vec<Value>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteStore for RecordingStore {
        async fn fetch_collection(&self, resource: &str) -> StoreResult<Vec<Value>> {
            self.calls.lock().await.push(format!("list {resource}"));
            Ok(self.collection.clone())
        }

        async fn fetch_one(&self, resource: &str, id: &str) -> StoreResult<Value> {
            self.calls.lock().await.push(format!("get {resource}/{id}"));
            Err(StoreError::not_found(format!("{resource} {id} not found")))
        }

        async fn create(&self, resource: &str, mut payload: Value) -> StoreResult<Value> {
            self.calls.lock().await.push(format!("create {resource}"));
            payload["id"] = json!("new-1");
            Ok(payload)
        }

        async fn update(&self, resource: &str, id: &str, payload: Value) -> StoreResult<Value> {
            self.calls.lock().await.push(format!("update {resource}/{id}"));
            Ok(payload)
        }

        async fn upload_asset(&self, _upload: AssetUpload) -> StoreResult<AssetUploaded> {
            Err(StoreError::network("uploads disabled"))
        }
    }

    #[tokio::test]
    async fn malformed_item_becomes_decode_error() {
        let store = RecordingStore {
            collection: vec![
                json!({"id": "p1", "first_name": "Ana", "last_name": "Paz", "document_number": "30111222"}),
                json!({"id": "p2", "first_name": 42}),
            ],
            ..Default::default()
        };

        let err = fetch_all::<Patient>(&store).await.expect_err("must fail");
        assert_eq!(err.kind, StoreErrorKind::Decode);
        assert!(err.message.contains("item 1"), "unexpected message: {}", err.message);
    }

    #[tokio::test]
    async fn save_routes_on_presence_of_id() {
        let store = RecordingStore::default();
        let draft = Treatment {
            name: "Limpieza facial".into(),
            price: 100.0,
            duration_minutes: 45,
            ..Default::default()
        };

        let created = save_entity(&store, &draft).await.expect("create");
        assert_eq!(created.id(), Some("new-1"));
        save_entity(&store, &created).await.expect("update");

        let calls = store.calls.lock().await.clone();
        assert_eq!(calls, vec!["create treatments", "update treatments/new-1"]);
    }

    #[tokio::test]
    async fn fetch_entity_passes_not_found_through() {
        let store = RecordingStore::default();
        let err = fetch_entity::<Patient>(&store, "p9").await.expect_err("missing");
        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert_eq!(err.message, "patients p9 not found");
    }
}
