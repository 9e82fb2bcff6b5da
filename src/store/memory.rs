use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{KnowledgeStore, StoreError};
use crate::{
    document::{Document, Filter, RawInstance, ID_KEY, REVISION_KEY},
    ontology::ResourceId,
};

const DEFAULT_BASE: &str = "https://kg.local/data";
const NAME_PATH: &str = "schema:name";

/// Store operations, used to inspect how often each was called.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    InstanceFromFullUri,
    FilterQuery,
    CreateNewInstance,
    UpdateInstance,
    List,
    ByName,
}

struct StoredInstance {
    path: String,
    instance: RawInstance,
}

#[derive(Default)]
struct State {
    instances: BTreeMap<ResourceId, StoredInstance>,
    /// Insertion order, used for listing.
    order: Vec<ResourceId>,
    calls: BTreeMap<Operation, usize>,
}

impl State {
    fn record(&mut self, operation: Operation) {
        *self.calls.entry(operation).or_default() += 1;
    }

    fn in_collection<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a RawInstance> + 'a {
        self.order.iter().filter_map(move |id| {
            self.instances
                .get(id)
                .filter(|stored| stored.path == path)
                .map(|stored| &stored.instance)
        })
    }

    fn store(&mut self, id: ResourceId, path: &str, instance: RawInstance) {
        if !self.instances.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.instances.insert(
            id,
            StoredInstance {
                path: path.to_string(),
                instance,
            },
        );
    }
}

/// [`KnowledgeStore`] keeping every resource in process memory.
///
/// Identifiers are `<base>/<path>/<uuid>`. Created resources start at
/// revision 1 and every accepted update increments it; updates carrying an
/// older revision are rejected.
pub struct InMemoryStore {
    base: String,
    state: Mutex<State>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASE)
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Seeds a resource without counting it as a store call.
    ///
    /// Keeps the document's `@id` when present. Returns the stored identifier.
    pub fn insert(&self, path: &str, document: Document) -> ResourceId {
        let mut instance = RawInstance::new(document);
        let id = instance.id().unwrap_or_else(|| self.mint_id(path));
        let data = instance.data_mut();
        data.insert(ID_KEY.to_string(), Value::from(id.as_str()));
        data.entry(REVISION_KEY.to_string()).or_insert(Value::from(1u64));
        self.guard().store(id.clone(), path, instance);
        id
    }

    /// Number of calls made to `operation` so far.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.guard().calls.get(&operation).copied().unwrap_or_default()
    }

    /// Number of stored resources across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guard().instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mint_id(&self, path: &str) -> ResourceId {
        ResourceId::new(format!(
            "{}/{}/{}",
            self.base,
            path.trim_matches('/'),
            Uuid::new_v4()
        ))
    }

    fn guard(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("in-memory knowledge store poisoned")
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn instance_from_full_uri(&self, id: &ResourceId) -> Result<RawInstance, StoreError> {
        let mut state = self.guard();
        state.record(Operation::InstanceFromFullUri);
        state
            .instances
            .get(id)
            .map(|stored| stored.instance.clone())
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn filter_query(
        &self,
        path: &str,
        filter: &Filter,
        _context: &Value,
    ) -> Result<Vec<RawInstance>, StoreError> {
        let mut state = self.guard();
        state.record(Operation::FilterQuery);
        let found: Vec<_> = state
            .in_collection(path)
            .filter(|instance| filter.matches(instance.data()))
            .cloned()
            .collect();
        debug!(path, matches = found.len(), "filter query");
        Ok(found)
    }

    async fn create_new_instance(
        &self,
        path: &str,
        mut document: Document,
    ) -> Result<RawInstance, StoreError> {
        if document.contains_key(ID_KEY) {
            return Err(StoreError::Rejected(
                "new resources must not carry an identifier".to_string(),
            ));
        }
        let id = self.mint_id(path);
        document.insert(ID_KEY.to_string(), Value::from(id.as_str()));
        document.insert(REVISION_KEY.to_string(), Value::from(1u64));
        let instance = RawInstance::new(document);

        let mut state = self.guard();
        state.record(Operation::CreateNewInstance);
        state.store(id, path, instance.clone());
        Ok(instance)
    }

    async fn update_instance(&self, mut instance: RawInstance) -> Result<RawInstance, StoreError> {
        let id = instance
            .id()
            .ok_or_else(|| StoreError::Rejected("update without an identifier".to_string()))?;

        let mut state = self.guard();
        state.record(Operation::UpdateInstance);
        let Some(stored) = state.instances.get(&id) else {
            return Err(StoreError::NotFound { id });
        };
        let current = stored.instance.revision().unwrap_or(1);
        if instance.revision() != Some(current) {
            return Err(StoreError::Conflict {
                id,
                expected: current,
                found: instance.revision(),
            });
        }
        let path = stored.path.clone();
        instance
            .data_mut()
            .insert(REVISION_KEY.to_string(), Value::from(current + 1));
        state.store(id, &path, instance.clone());
        Ok(instance)
    }

    async fn list(
        &self,
        path: &str,
        size: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<RawInstance>, StoreError> {
        let mut state = self.guard();
        state.record(Operation::List);
        let page = state
            .in_collection(path)
            .filter(|instance| filter.map_or(true, |filter| filter.matches(instance.data())))
            .take(size)
            .cloned()
            .collect();
        Ok(page)
    }

    async fn by_name(&self, path: &str, name: &str) -> Result<Option<RawInstance>, StoreError> {
        let mut state = self.guard();
        state.record(Operation::ByName);
        let filter = Filter::equals(NAME_PATH, name);
        let found = state
            .in_collection(path)
            .find(|instance| filter.matches(instance.data()))
            .cloned();
        Ok(found)
    }
}
