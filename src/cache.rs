//! Identity cache: at most one live object per resource identifier.
//!
//! The cache never evicts. Entries are added by the caching factory, by
//! proxy and query resolution, and after a successful create.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::{object::KnowledgeObject, ontology::ResourceId};

#[derive(Default)]
pub struct IdentityCache {
    objects: DashMap<ResourceId, Arc<KnowledgeObject>>,
}

impl IdentityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &ResourceId) -> Option<Arc<KnowledgeObject>> {
        self.objects.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Stores `object` as the canonical instance for `id`, replacing any
    /// previous entry.
    pub fn put(&self, id: ResourceId, object: Arc<KnowledgeObject>) {
        self.objects.insert(id, object);
    }

    /// Stores `object` unless `id` is already cached, and returns the
    /// canonical instance either way.
    pub fn insert_if_absent(&self, id: ResourceId, object: Arc<KnowledgeObject>) -> Arc<KnowledgeObject> {
        Arc::clone(self.objects.entry(id).or_insert(object).value())
    }

    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.objects.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Memoizes a construct-from-document step through `cache`.
///
/// `identify` extracts the identifier from the input. When that identifier is
/// cached the cached object is returned unchanged and `construct` is not
/// called. Otherwise `construct` runs and its result is cached under the
/// object's own identifier; if another caller cached that identifier in the
/// meantime, the earlier instance is returned instead. Objects without an
/// identifier are returned uncached.
pub fn cached<I, E>(
    cache: &IdentityCache,
    input: I,
    identify: impl FnOnce(&I) -> Option<ResourceId>,
    construct: impl FnOnce(I) -> Result<Arc<KnowledgeObject>, E>,
) -> Result<Arc<KnowledgeObject>, E> {
    if let Some(id) = identify(&input) {
        if let Some(object) = cache.get(&id) {
            debug!(id = %id, "identity cache hit");
            return Ok(object);
        }
    }
    let object = construct(input)?;
    let Some(id) = object.id().cloned() else {
        return Ok(object);
    };
    debug!(id = %id, "identity cache insert");
    Ok(cache.insert_if_absent(id, object))
}
