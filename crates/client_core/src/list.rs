use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    entity::Entity,
    error::ClientError,
    filter::{apply_filter, FilterCriteria},
    status::{RequestStatus, RequestTokens},
    store::{self, RemoteStore},
};

#[derive(Debug, Clone)]
pub struct ListState<E> {
    collection: Vec<E>,
    filtered: Vec<E>,
    criteria: FilterCriteria,
    status: RequestStatus,
    loaded: bool,
    tokens: RequestTokens,
}

impl<E> Default for ListState<E> {
    fn default() -> Self {
        Self {
            collection: Vec::new(),
            filtered: Vec::new(),
            criteria: FilterCriteria::default(),
            status: RequestStatus::Idle,
            loaded: false,
            tokens: RequestTokens::default(),
        }
    }
}

impl<E: Entity> ListState<E> {
    pub fn collection(&self) -> &[E] {
        &self.collection
    }

    pub fn filtered(&self) -> &[E] {
        &self.filtered
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded
    }

    /// Loaded, but nothing survives the filter. Not an error.
    pub fn is_empty_result(&self) -> bool {
        self.loaded && self.filtered.is_empty()
    }

    fn refilter(&mut self) {
        self.filtered = apply_filter(&self.collection, &self.criteria);
    }
}

pub struct EntityListController<E: Entity> {
    store: Arc<dyn RemoteStore>,
    state: watch::Sender<ListState<E>>,
}

impl<E: Entity> EntityListController<E> {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self { store, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<E>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ListState<E> {
        self.state.borrow().clone()
    }

    /// A failed load keeps whatever was loaded before.
    pub async fn load(&self) -> Result<usize, ClientError> {
        let token = self.begin()?;
        info!(resource = E::RESOURCE, token, "list: loading collection");

        let result = store::fetch_all::<E>(self.store.as_ref()).await;

        let mut outcome = Err(ClientError::Superseded);
        self.state.send_if_modified(|state| {
            if !state.tokens.is_current(token) {
                debug!(resource = E::RESOURCE, token, "list: discarding stale response");
                return false;
            }
            outcome = match result {
                Ok(items) => {
                    let count = items.len();
                    state.collection = items;
                    state.loaded = true;
                    state.refilter();
                    state.status.settle();
                    info!(resource = E::RESOURCE, count, "list: collection loaded");
                    Ok(count)
                }
                Err(err) => {
                    warn!(resource = E::RESOURCE, error = %err, "list: load failed");
                    state.status.fail(err.message.clone());
                    Err(err.into())
                }
            };
            true
        });
        outcome
    }

    pub fn set_filter(&self, criteria: FilterCriteria) {
        self.state.send_modify(|state| {
            state.criteria = criteria;
            state.refilter();
        });
    }

    pub fn reconcile(&self, entity: E) {
        self.state.send_modify(|state| {
            let existing = entity
                .id()
                .and_then(|id| state.collection.iter().position(|item| item.id() == Some(id)));
            match existing {
                Some(index) => state.collection[index] = entity,
                None => state.collection.push(entity),
            }
            state.refilter();
        });
    }

    pub fn dismiss(&self) {
        self.state.send_if_modified(|state| {
            let before = state.status.clone();
            state.status.dismiss();
            before != state.status
        });
    }

    pub fn unmount(&self) {
        self.state.send_modify(|state| state.tokens.detach());
    }

    fn begin(&self) -> Result<u64, ClientError> {
        let mut token = None;
        self.state.send_if_modified(|state| {
            if state.tokens.is_detached() {
                return false;
            }
            token = Some(state.tokens.issue());
            state.status.start();
            true
        });
        token.ok_or(ClientError::Detached)
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
