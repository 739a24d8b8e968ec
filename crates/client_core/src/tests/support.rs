use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::protocol::AssetUploaded;
use tokio::sync::oneshot;

use crate::store::{AssetUpload, RemoteStore, StoreError, StoreResult};

#[derive(Default)]
pub(crate) struct FakeStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    entities: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, StoreError>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    uploads: Mutex<Vec<AssetUpload>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<u32>,
}

impl FakeStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_collection(&self, resource: &str, items: Vec<Value>) {
        self.collections
            .lock()
            .unwrap()
            .insert(resource.to_string(), items);
    }

    pub(crate) fn insert(&self, resource: &str, id: &str, value: Value) {
        self.entities
            .lock()
            .unwrap()
            .insert(format!("{resource}/{id}"), value);
    }

    /// Makes the call described by `key` (e.g. `"update treatments/t1"`)
    /// fail with `err` until cleared.
    pub(crate) fn fail(&self, key: &str, err: StoreError) {
        self.failures.lock().unwrap().insert(key.to_string(), err);
    }

    pub(crate) fn clear_failure(&self, key: &str) {
        self.failures.lock().unwrap().remove(key);
    }

    /// Holds the next call described by `key` until the sender fires.
    pub(crate) fn gate(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_string(), rx);
        tx
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub(crate) fn uploads(&self) -> Vec<AssetUpload> {
        self.uploads.lock().unwrap().clone()
    }

    async fn enter(&self, key: String) -> StoreResult<()> {
        self.calls.lock().unwrap().push(key.clone());
        let gate = self.gates.lock().unwrap().remove(&key);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failure = self.failures.lock().unwrap().get(&key).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn fetch_collection(&self, resource: &str) -> StoreResult<Vec<Value>> {
        self.enter(format!("list {resource}")).await?;
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(resource)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_one(&self, resource: &str, id: &str) -> StoreResult<Value> {
        self.enter(format!("get {resource}/{id}")).await?;
        self.entities
            .lock()
            .unwrap()
            .get(&format!("{resource}/{id}"))
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("{resource} {id} no encontrado")))
    }

    async fn create(&self, resource: &str, mut payload: Value) -> StoreResult<Value> {
        self.enter(format!("create {resource}")).await?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("new-{}", *next)
        };
        payload["id"] = json!(id);
        self.insert(resource, &id, payload.clone());
        Ok(payload)
    }

    async fn update(&self, resource: &str, id: &str, payload: Value) -> StoreResult<Value> {
        self.enter(format!("update {resource}/{id}")).await?;
        self.insert(resource, id, payload.clone());
        Ok(payload)
    }

    async fn upload_asset(&self, upload: AssetUpload) -> StoreResult<AssetUploaded> {
        self.enter(format!("upload {}", upload.filename)).await?;
        let url = format!("https://cdn.example.com/{}", upload.filename);
        self.uploads.lock().unwrap().push(upload);
        Ok(AssetUploaded { url })
    }
}
