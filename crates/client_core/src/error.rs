use thiserror::Error;

use crate::{
    entity::FieldError,
    store::{StoreError, StoreErrorKind},
    validation::ValidationError,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Asset(String),
    #[error("another request is already in progress")]
    Busy,
    #[error("the form is not ready for editing")]
    NotReady,
    #[error("no active session")]
    NoSession,
    #[error("request superseded by a newer one")]
    Superseded,
    #[error("controller is no longer mounted")]
    Detached,
}

impl ClientError {
    /// Failures the user can fix by re-invoking the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Conflict(_) | Self::Busy)
    }
}

impl From<StoreError> for ClientError {
    fn from(value: StoreError) -> Self {
        match value.kind {
            StoreErrorKind::NotFound => Self::NotFound(value.message),
            StoreErrorKind::Conflict => Self::Conflict(value.message),
            StoreErrorKind::Network | StoreErrorKind::Decode => Self::Network(value.message),
        }
    }
}
