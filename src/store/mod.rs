//! Contract of the remote knowledge store.
//!
//! The mapping layer never talks to a transport directly. Everything it needs
//! from the store goes through [`KnowledgeStore`]; [`InMemoryStore`] is the
//! bundled adapter used for tests and local experiments.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    document::{Document, Filter, RawInstance},
    ontology::ResourceId,
};

pub mod memory;

pub use memory::{InMemoryStore, Operation};

/// Failures reported by a [`KnowledgeStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No resource is stored under the identifier.
    #[error("no resource found at `{id}`")]
    NotFound { id: ResourceId },

    /// The store refused the document.
    #[error("store rejected the request: {0}")]
    Rejected(String),

    /// The update was based on a stale revision.
    #[error("revision conflict on `{id}`: store is at {expected}, update carries {found:?}")]
    Conflict {
        id: ResourceId,
        expected: u64,
        found: Option<u64>,
    },

    /// Transport or backend specific failure.
    #[error(transparent)]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Operations the mapping layer requires from a knowledge graph store.
///
/// Collections are addressed by a path such as
/// `neuralactivity/simulation/modelproject/v0.1.0`; resources by their full
/// identifier.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Fetches one resource by identifier.
    ///
    /// Implementors must fail with [`StoreError::NotFound`] when the resource
    /// is missing.
    async fn instance_from_full_uri(&self, id: &ResourceId) -> Result<RawInstance, StoreError>;

    /// Returns every resource of the collection matching `filter`.
    ///
    /// `context` carries the prefixes used by the filter paths.
    async fn filter_query(
        &self,
        path: &str,
        filter: &Filter,
        context: &Value,
    ) -> Result<Vec<RawInstance>, StoreError>;

    /// Stores a new resource and returns it with its assigned identifier.
    async fn create_new_instance(
        &self,
        path: &str,
        document: Document,
    ) -> Result<RawInstance, StoreError>;

    /// Replaces a resource with `instance` and returns the stored result.
    ///
    /// Implementors tracking revisions should reject stale updates with
    /// [`StoreError::Conflict`].
    async fn update_instance(&self, instance: RawInstance) -> Result<RawInstance, StoreError>;

    /// Lists up to `size` resources of the collection, optionally filtered.
    async fn list(
        &self,
        path: &str,
        size: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<RawInstance>, StoreError>;

    /// Returns the first resource of the collection with the given name.
    async fn by_name(&self, path: &str, name: &str) -> Result<Option<RawInstance>, StoreError>;
}
