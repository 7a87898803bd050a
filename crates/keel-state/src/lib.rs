//! keel-state — deployment records and their authoritative store.
//!
//! The `DeploymentStore` owns the canonical copy of every `Deployment`.
//! Callers always receive clones; the only way to change a stored record
//! is to hand a modified copy back through [`DeploymentStore::update`].
//!
//! The store is `Clone` + `Send` + `Sync` (backed by `Arc<RwLock<..>>`)
//! and can be shared across request handlers. State lives for the
//! lifetime of the process only.

pub mod error;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::DeploymentStore;
pub use types::*;
