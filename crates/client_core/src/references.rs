use std::{fmt::Debug, sync::Arc};

use serde::de::DeserializeOwned;
use shared::domain::{ConsentTemplate, Doctor};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    status::{RequestStatus, RequestTokens},
    store::{self, RemoteStore},
};

pub trait CatalogItem: Clone + Debug + DeserializeOwned + Send + Sync + 'static {
    const RESOURCE: &'static str;

    fn catalog_id(&self) -> &str;

    fn label(&self) -> String;
}

impl CatalogItem for Doctor {
    const RESOURCE: &'static str = "doctors";

    fn catalog_id(&self) -> &str {
        self.id.as_str()
    }

    fn label(&self) -> String {
        self.display_name()
    }
}

impl CatalogItem for ConsentTemplate {
    const RESOURCE: &'static str = "consent_templates";

    fn catalog_id(&self) -> &str {
        self.id.as_str()
    }

    fn label(&self) -> String {
        self.title.clone()
    }
}

/// `available` and `assigned` always partition `catalog`. Selected ids that
/// no longer resolve stay in `selected` but are never displayed.
#[derive(Debug, Clone)]
pub struct ReferenceSet<C> {
    catalog: Vec<C>,
    selected: Vec<String>,
    available: Vec<C>,
    assigned: Vec<C>,
}

impl<C> Default for ReferenceSet<C> {
    fn default() -> Self {
        Self {
            catalog: Vec::new(),
            selected: Vec::new(),
            available: Vec::new(),
            assigned: Vec::new(),
        }
    }
}

impl<C: CatalogItem> ReferenceSet<C> {
    pub fn new(catalog: Vec<C>, selected: Vec<String>) -> Self {
        let mut set = Self {
            catalog,
            selected: Vec::new(),
            available: Vec::new(),
            assigned: Vec::new(),
        };
        set.bind(selected);
        set
    }

    pub fn catalog(&self) -> &[C] {
        &self.catalog
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn available(&self) -> &[C] {
        &self.available
    }

    pub fn assigned(&self) -> &[C] {
        &self.assigned
    }

    pub fn stale_ids(&self) -> Vec<&str> {
        self.selected
            .iter()
            .filter(|id| self.resolve(id).is_none())
            .map(String::as_str)
            .collect()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|selected| selected == id)
    }

    pub fn resolve(&self, id: &str) -> Option<&C> {
        self.catalog.iter().find(|item| item.catalog_id() == id)
    }

    pub fn set_catalog(&mut self, catalog: Vec<C>) {
        self.catalog = catalog;
        self.recompute();
    }

    pub fn bind(&mut self, selected: Vec<String>) {
        self.selected.clear();
        for id in selected {
            if !self.is_selected(&id) {
                self.selected.push(id);
            }
        }
        self.recompute();
    }

    /// No-op when `id` is already selected or unknown to the catalog.
    pub fn add(&mut self, id: &str) -> bool {
        if self.is_selected(id) || self.resolve(id).is_none() {
            return false;
        }
        self.selected.push(id.to_string());
        self.recompute();
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|selected| selected != id);
        let removed = self.selected.len() != before;
        if removed {
            self.recompute();
        }
        removed
    }

    fn recompute(&mut self) {
        let (assigned, available): (Vec<C>, Vec<C>) = self
            .catalog
            .iter()
            .cloned()
            .partition(|item| self.is_selected(item.catalog_id()));
        self.assigned = assigned;
        self.available = available;
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceState<C> {
    set: ReferenceSet<C>,
    status: RequestStatus,
    tokens: RequestTokens,
}

impl<C> Default for ReferenceState<C> {
    fn default() -> Self {
        Self {
            set: ReferenceSet::default(),
            status: RequestStatus::Idle,
            tokens: RequestTokens::default(),
        }
    }
}

impl<C: CatalogItem> ReferenceState<C> {
    pub fn references(&self) -> &ReferenceSet<C> {
        &self.set
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }
}

pub struct ReferenceController<C: CatalogItem> {
    store: Arc<dyn RemoteStore>,
    state: watch::Sender<ReferenceState<C>>,
}

impl<C: CatalogItem> ReferenceController<C> {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let (state, _) = watch::channel(ReferenceState::default());
        Self { store, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReferenceState<C>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ReferenceState<C> {
        self.state.borrow().clone()
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.state.borrow().set.selected().to_vec()
    }

    pub async fn load_catalog(&self) -> Result<usize, ClientError> {
        let mut token = None;
        self.state.send_if_modified(|state| {
            if state.tokens.is_detached() {
                return false;
            }
            token = Some(state.tokens.issue());
            state.status.start();
            true
        });
        let token = token.ok_or(ClientError::Detached)?;
        info!(resource = C::RESOURCE, token, "references: loading catalog");

        let result = store::fetch_catalog::<C>(self.store.as_ref(), C::RESOURCE).await;

        let mut outcome = Err(ClientError::Superseded);
        self.state.send_if_modified(|state| {
            if !state.tokens.is_current(token) {
                debug!(resource = C::RESOURCE, token, "references: discarding stale catalog");
                return false;
            }
            outcome = match result {
                Ok(catalog) => {
                    let count = catalog.len();
                    state.set.set_catalog(catalog);
                    state.status.settle();
                    Ok(count)
                }
                Err(err) => {
                    warn!(resource = C::RESOURCE, error = %err, "references: catalog load failed");
                    state.status.fail(err.message.clone());
                    Err(err.into())
                }
            };
            true
        });
        outcome
    }

    pub fn bind(&self, selected: Vec<String>) {
        self.state.send_modify(|state| state.set.bind(selected));
    }

    pub fn add(&self, id: &str) -> bool {
        self.state.send_if_modified(|state| state.set.add(id))
    }

    pub fn remove(&self, id: &str) -> bool {
        self.state.send_if_modified(|state| state.set.remove(id))
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
}

#[cfg(test)]
#[path = "tests/references_tests.rs"]
mod tests;
