pub mod asset;
pub mod config;
mod entities;
pub mod entity;
pub mod error;
pub mod filter;
pub mod form;
pub mod http_store;
pub mod list;
pub mod references;
pub mod session;
pub mod status;
pub mod store;
pub mod validation;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

pub use config::{load_settings, Settings};
pub use entity::{Entity, FieldInput, FieldValue};
pub use error::ClientError;
pub use filter::{Facet, FilterCriteria};
pub use form::{EntityFormController, FormMode, FormPhase, FormState};
pub use http_store::HttpRemoteStore;
pub use list::{EntityListController, ListState};
pub use references::{CatalogItem, ReferenceController, ReferenceSet};
pub use session::{SessionProvider, StaticSession};
pub use status::RequestStatus;
pub use store::RemoteStore;
