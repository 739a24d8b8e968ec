use std::{collections::BTreeMap, path::Path, sync::Arc};

use shared::protocol::AssetKind;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    asset::{oversized, PendingAsset},
    entity::{coerce, Entity, FieldError, FieldInput, FieldKind, FieldValue},
    error::ClientError,
    session::SessionProvider,
    status::{RequestStatus, RequestTokens},
    store::{self, RemoteStore},
    validation::{validate, ValidationError},
};

const DEFAULT_MAX_ASSET_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Submitting,
    /// Terminal until a fresh load is requested.
    NotFound(String),
    /// Terminal until a fresh load is requested.
    LoadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Create,
    Edit,
}

#[derive(Debug, Clone)]
pub struct FormState<E> {
    phase: FormPhase,
    mode: FormMode,
    draft: E,
    original: Option<E>,
    field_errors: BTreeMap<String, String>,
    validation_error: Option<ValidationError>,
    pending_asset: Option<PendingAsset>,
    status: RequestStatus,
    tokens: RequestTokens,
    asset_generation: u64,
}

impl<E: Entity> Default for FormState<E> {
    fn default() -> Self {
        Self {
            phase: FormPhase::Uninitialized,
            mode: FormMode::Create,
            draft: E::default(),
            original: None,
            field_errors: BTreeMap::new(),
            validation_error: None,
            pending_asset: None,
            status: RequestStatus::Idle,
            tokens: RequestTokens::default(),
            asset_generation: 0,
        }
    }
}

impl<E: Entity> FormState<E> {
    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &E {
        &self.draft
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn is_editable(&self) -> bool {
        self.phase == FormPhase::Ready
    }

    pub fn is_dirty(&self) -> bool {
        let reference = self.original.clone().unwrap_or_default();
        serde_json::to_value(&self.draft).ok() != serde_json::to_value(&reference).ok()
            || self.pending_asset.is_some()
    }

    pub fn field_error(&self, name: &str) -> Option<&str> {
        self.field_errors.get(name).map(String::as_str)
    }

    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn pending_asset(&self) -> Option<&PendingAsset> {
        self.pending_asset.as_ref()
    }

    pub fn preview_for(&self, field: &str) -> Option<String> {
        if let Some(asset) = self.pending_asset.as_ref().filter(|a| a.field == field) {
            return Some(asset.preview.clone());
        }
        match self.draft.field(field) {
            Some(FieldValue::Text(url)) if !url.is_empty() => Some(url),
            _ => None,
        }
    }

    fn enter_ready(&mut self, mode: FormMode, draft: E, original: Option<E>) {
        self.phase = FormPhase::Ready;
        self.mode = mode;
        self.draft = draft;
        self.original = original;
        self.field_errors.clear();
        self.pending_asset = None;
        self.validation_error = None;
    }
}

pub struct EntityFormController<E: Entity> {
    store: Arc<dyn RemoteStore>,
    session: Arc<dyn SessionProvider>,
    state: watch::Sender<FormState<E>>,
    max_asset_bytes: usize,
}

impl<E: Entity> EntityFormController<E> {
    pub fn new(store: Arc<dyn RemoteStore>, session: Arc<dyn SessionProvider>) -> Self {
        let (state, _) = watch::channel(FormState::default());
        Self {
            store,
            session,
            state,
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
        }
    }

    pub fn with_max_asset_bytes(mut self, max_asset_bytes: usize) -> Self {
        self.max_asset_bytes = max_asset_bytes;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<FormState<E>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FormState<E> {
        self.state.borrow().clone()
    }

    pub fn new_draft(&self) -> Result<(), ClientError> {
        let mut result = Err(ClientError::Detached);
        self.state.send_if_modified(|state| {
            if state.tokens.is_detached() {
                return false;
            }
            if state.phase == FormPhase::Submitting {
                result = Err(ClientError::Busy);
                return false;
            }
            state.tokens.issue();
            state.status = RequestStatus::Idle;
            state.enter_ready(FormMode::Create, E::default(), None);
            result = Ok(());
            true
        });
        result
    }

    pub async fn load_for_edit(&self, id: &str) -> Result<(), ClientError> {
        let mut token = Err(ClientError::Detached);
        self.state.send_if_modified(|state| {
            if state.tokens.is_detached() {
                return false;
            }
            if state.phase == FormPhase::Submitting {
                token = Err(ClientError::Busy);
                return false;
            }
            token = Ok(state.tokens.issue());
            state.phase = FormPhase::Loading;
            state.status.start();
            state.pending_asset = None;
            state.field_errors.clear();
            state.validation_error = None;
            true
        });
        let token = token?;
        info!(resource = E::RESOURCE, %id, token, "form: loading entity");

        let result = store::fetch_entity::<E>(self.store.as_ref(), id).await;

        let mut outcome = Err(ClientError::Superseded);
        self.state.send_if_modified(|state| {
            if !state.tokens.is_current(token) {
                debug!(resource = E::RESOURCE, %id, token, "form: discarding stale load");
                return false;
            }
            outcome = match result {
                Ok(entity) => {
                    state.status.settle();
                    state.enter_ready(FormMode::Edit, entity.clone(), Some(entity));
                    Ok(())
                }
                Err(err) => {
                    let err = ClientError::from(err);
                    warn!(resource = E::RESOURCE, %id, error = %err, "form: load failed");
                    state.phase = match &err {
                        ClientError::NotFound(message) => FormPhase::NotFound(message.clone()),
                        other => FormPhase::LoadFailed(other.to_string()),
                    };
                    state.status.fail(err.to_string());
                    Err(err)
                }
            };
            true
        });
        outcome
    }

    pub async fn load_own_profile(&self) -> Result<(), ClientError> {
        let Some(user_id) = self.session.current_user_id() else {
            self.state.send_modify(|state| state.status.fail("No hay una sesión activa"));
            return Err(ClientError::NoSession);
        };
        self.load_for_edit(user_id.as_str()).await
    }

    pub fn update_field(&self, name: &str, input: impl Into<FieldInput>) -> Result<(), ClientError> {
        let input = input.into();
        let mut result = Err(ClientError::NotReady);
        self.state.send_if_modified(|state| {
            if state.phase != FormPhase::Ready {
                return false;
            }
            let Some(spec) = E::spec(name) else {
                result = Err(FieldError::Unknown(name.to_string()).into());
                return false;
            };
            let applied = coerce(spec, input).and_then(|value| state.draft.set_field(name, value));
            state.status.dismiss();
            match applied {
                Ok(()) => {
                    state.field_errors.remove(name);
                    state.validation_error = validate(&state.draft).err();
                    result = Ok(());
                }
                Err(err) => {
                    debug!(resource = E::RESOURCE, field = name, error = %err, "form: input rejected");
                    state.field_errors.insert(name.to_string(), err.to_string());
                    result = Err(err.into());
                }
            }
            true
        });
        result
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut result = Ok(());
        self.state.send_modify(|state| {
            result = validate(&state.draft);
            state.validation_error = result.clone().err();
        });
        result
    }

    pub async fn select_asset(&self, field: &str, path: &Path) -> Result<(), ClientError> {
        let kind = self.asset_kind(field)?;
        let mut generation = None;
        self.state.send_if_modified(|state| {
            if state.phase == FormPhase::Ready && !state.tokens.is_detached() {
                state.asset_generation += 1;
                generation = Some(state.asset_generation);
            }
            false
        });
        let generation = generation.ok_or(ClientError::NotReady)?;

        let asset = PendingAsset::read(field, kind, path, self.max_asset_bytes).await;

        let mut outcome = Err(ClientError::Superseded);
        self.state.send_if_modified(|state| {
            if state.tokens.is_detached()
                || state.phase != FormPhase::Ready
                || state.asset_generation != generation
            {
                return false;
            }
            outcome = match asset {
                Ok(asset) => {
                    info!(resource = E::RESOURCE, field, filename = %asset.filename, "form: asset selected");
                    state.status.dismiss();
                    state.field_errors.remove(field);
                    state.pending_asset = Some(asset);
                    Ok(())
                }
                Err(err) => {
                    state.field_errors.insert(field.to_string(), err.to_string());
                    Err(err)
                }
            };
            true
        });
        outcome
    }

    pub fn select_asset_bytes(
        &self,
        field: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let kind = self.asset_kind(field)?;
        let asset = if bytes.len() > self.max_asset_bytes {
            Err(oversized(filename, self.max_asset_bytes))
        } else {
            Ok(PendingAsset::from_bytes(field, kind, filename, bytes))
        };
        let mut result = Err(ClientError::NotReady);
        self.state.send_if_modified(|state| {
            if state.phase != FormPhase::Ready {
                return false;
            }
            state.asset_generation += 1;
            state.status.dismiss();
            result = match asset {
                Ok(asset) => {
                    state.field_errors.remove(field);
                    state.pending_asset = Some(asset);
                    Ok(())
                }
                Err(err) => {
                    state.field_errors.insert(field.to_string(), err.to_string());
                    Err(err)
                }
            };
            true
        });
        result
    }

    pub fn clear_asset(&self) {
        self.state.send_if_modified(|state| {
            if state.phase != FormPhase::Ready {
                return false;
            }
            state.asset_generation += 1;
            state.pending_asset.take().is_some()
        });
    }

    /// The mutation is never issued when validation or the upload fails.
    pub async fn submit(&self) -> Result<E, ClientError> {
        let (token, mut draft, pending) = self.begin_submit()?;
        info!(
            resource = E::RESOURCE,
            id = draft.id().unwrap_or("new"),
            with_asset = pending.is_some(),
            "form: submitting"
        );

        if let Some(asset) = pending {
            let uploaded = self.store.upload_asset(asset.to_upload()).await;
            match uploaded {
                Ok(uploaded) => {
                    if let Err(err) = draft.set_field(&asset.field, FieldValue::Text(uploaded.url)) {
                        return self.finish_failed(token, err.into());
                    }
                    // The draft cannot change while submitting, so the merged
                    // copy replaces it wholesale.
                    let mut applied = false;
                    self.state.send_if_modified(|state| {
                        if !state.tokens.is_current(token) {
                            return false;
                        }
                        state.draft = draft.clone();
                        state.pending_asset = None;
                        applied = true;
                        true
                    });
                    if !applied {
                        return Err(ClientError::Superseded);
                    }
                }
                Err(err) => {
                    let err = ClientError::from(err);
                    warn!(resource = E::RESOURCE, error = %err, "form: asset upload failed");
                    return self.finish_failed(token, err);
                }
            }
        }

        let saved = store::save_entity(self.store.as_ref(), &draft).await;

        match saved {
            Ok(saved) => {
                let mut outcome = Err(ClientError::Superseded);
                self.state.send_if_modified(|state| {
                    if !state.tokens.is_current(token) {
                        return false;
                    }
                    let message = match state.mode {
                        FormMode::Create => {
                            state.enter_ready(FormMode::Create, E::default(), None);
                            format!("{} creado correctamente", E::LABEL)
                        }
                        FormMode::Edit => {
                            state.enter_ready(FormMode::Edit, saved.clone(), Some(saved.clone()));
                            format!("{} actualizado correctamente", E::LABEL)
                        }
                    };
                    info!(resource = E::RESOURCE, id = saved.id().unwrap_or(""), "form: submit succeeded");
                    state.status.succeed(message);
                    outcome = Ok(saved);
                    true
                });
                outcome
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(resource = E::RESOURCE, error = %err, "form: submit failed");
                self.finish_failed(token, err)
            }
        }
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

    fn asset_kind(&self, field: &str) -> Result<AssetKind, ClientError> {
        match E::spec(field).map(|spec| spec.kind) {
            Some(FieldKind::Asset(kind)) => Ok(kind),
            Some(_) => Err(ClientError::Asset(format!("field `{field}` does not accept files"))),
            None => Err(FieldError::Unknown(field.to_string()).into()),
        }
    }

    fn begin_submit(&self) -> Result<(u64, E, Option<PendingAsset>), ClientError> {
        let mut started = Err(ClientError::Detached);
        self.state.send_if_modified(|state| {
            if state.tokens.is_detached() {
                return false;
            }
            if state.phase == FormPhase::Submitting || state.status.is_loading() {
                started = Err(ClientError::Busy);
                return false;
            }
            if state.phase != FormPhase::Ready {
                started = Err(ClientError::NotReady);
                return false;
            }
            if let Err(err) = validate(&state.draft) {
                debug!(resource = E::RESOURCE, error = %err, "form: submit blocked by validation");
                state.status.fail(err.message.clone());
                state.validation_error = Some(err.clone());
                started = Err(err.into());
                return true;
            }
            let token = state.tokens.issue();
            state.phase = FormPhase::Submitting;
            state.status.start();
            state.validation_error = None;
            started = Ok((token, state.draft.clone(), state.pending_asset.clone()));
            true
        });
        started
    }

    fn finish_failed(&self, token: u64, err: ClientError) -> Result<E, ClientError> {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if !state.tokens.is_current(token) {
                return false;
            }
            state.phase = FormPhase::Ready;
            state.status.fail(err.to_string());
            applied = true;
            true
        });
        if applied {
            Err(err)
        } else {
            Err(ClientError::Superseded)
        }
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
