//! Record persistence layer.
//!
//! The embedded object database is an external collaborator consumed through
//! the narrow [`RecordStore`] contract: one JSON record per logical entity,
//! keyed by id within a named collection. Service code never touches the
//! contract directly; it goes through a [`TypedCollection`] whose codec comes
//! from the process-wide [`SchemaRegistry`].
//!
//! - **memory**: reference in-memory store, used on device and in every test
//! - **registry**: type id -> codec mapping with register-if-absent semantics
//! - **typed**: typed facade over `dyn RecordStore` + registry

pub mod memory;
pub mod registry;
pub mod typed;

pub use memory::{MemoryStore, MemoryStoreStats};
pub use registry::{RecordSchema, SchemaRegistry};
pub use typed::TypedCollection;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Collection names used by the advisor service
pub mod collections {
    pub const INVITATIONS: &str = "advisor_invitations";
    pub const RESPONSES: &str = "advisor_responses";
}

/// Errors from the persistence boundary
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Record could not be encoded or decoded
    #[error("record codec failure: {0}")]
    Codec(String),

    /// No codec registered for the type id
    #[error("unregistered schema: {0}")]
    UnregisteredSchema(String),

    /// The storage backend itself failed
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Contract for the on-device object store.
///
/// Implementations must tolerate unknown collections (`get`/`get_all` return
/// empty, `delete` is a no-op) so the service can be pointed at a fresh box
/// without a provisioning step.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by key; `None` when absent
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or replace a record
    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError>;

    /// Delete a record; deleting a missing key is a no-op
    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// All records currently in a collection
    async fn get_all(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}
