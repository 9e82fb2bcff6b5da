//! Session context: registry, identity cache and store bound together.
//!
//! A session is the unit of identity. Within one session every path leading
//! to an identifier (direct fetch, proxy, query, listing, create) yields the
//! same `Arc<KnowledgeObject>`; two sessions never share objects.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::{
    cache::{cached, IdentityCache},
    config::SessionSettings,
    document::{Filter, RawInstance},
    object::{KnowledgeObject, Properties},
    ontology::{OntologyTerm, ResourceId},
    reference::{ProxyReference, QueryReference},
    registry::ClassRegistry,
    schema::EntityClass,
    store::KnowledgeStore,
    Result,
};

pub struct Session {
    registry: Arc<ClassRegistry>,
    cache: IdentityCache,
    store: Arc<dyn KnowledgeStore>,
    settings: SessionSettings,
}

impl Session {
    #[must_use]
    pub fn new(registry: Arc<ClassRegistry>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            registry,
            cache: IdentityCache::new(),
            store,
            settings: SessionSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    #[must_use]
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    #[must_use]
    pub fn store(&self) -> &dyn KnowledgeStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Entity class registered under `name`.
    pub fn class(&self, name: &str) -> Result<Arc<EntityClass>> {
        self.registry.entity(name)
    }

    /// Creates a transient object of the named class.
    pub fn create(&self, class_name: &str, properties: Properties) -> Result<Arc<KnowledgeObject>> {
        let class = self.class(class_name)?;
        Ok(Arc::new(KnowledgeObject::new(class, None, None, properties)?))
    }

    /// Caching factory: returns the cached object for the instance's
    /// identifier, or decodes the instance and caches the result.
    pub fn from_instance(
        &self,
        class: &Arc<EntityClass>,
        instance: RawInstance,
    ) -> Result<Arc<KnowledgeObject>> {
        cached(
            &self.cache,
            instance,
            |instance: &RawInstance| instance.id(),
            |instance| {
                KnowledgeObject::from_instance(Arc::clone(class), &self.registry, instance)
                    .map(Arc::new)
            },
        )
    }

    /// Loads one resource by identifier, answering from the cache when
    /// possible.
    pub async fn from_uri(
        &self,
        class: &Arc<EntityClass>,
        id: &ResourceId,
    ) -> Result<Arc<KnowledgeObject>> {
        if let Some(object) = self.cache.get(id) {
            debug!(class = class.name(), id = %id, "loaded from cache");
            return Ok(object);
        }
        let instance = self.store.instance_from_full_uri(id).await?;
        self.from_instance(class, instance)
    }

    /// Lists resources of the named class, `page_size` of them when `size`
    /// is not given.
    pub async fn list(
        &self,
        class_name: &str,
        size: Option<usize>,
        filter: Option<&Filter>,
    ) -> Result<Vec<Arc<KnowledgeObject>>> {
        let class = self.class(class_name)?;
        let size = size.unwrap_or(self.settings.page_size);
        let instances = self.store.list(class.path(), size, filter).await?;
        instances
            .into_iter()
            .map(|instance| self.from_instance(&class, instance))
            .collect()
    }

    /// Finds a resource of the named class by name.
    pub async fn by_name(
        &self,
        class_name: &str,
        name: &str,
    ) -> Result<Option<Arc<KnowledgeObject>>> {
        let class = self.class(class_name)?;
        match self.store.by_name(class.path(), name).await? {
            Some(instance) => self.from_instance(&class, instance).map(Some),
            None => Ok(None),
        }
    }

    pub fn proxy(&self, class_name: &str, id: impl Into<ResourceId>) -> Result<ProxyReference> {
        Ok(ProxyReference::new(self.class(class_name)?, id.into()))
    }

    pub fn query(&self, class_name: &str, filter: Filter, context: Value) -> Result<QueryReference> {
        Ok(QueryReference::new(self.class(class_name)?, filter, context))
    }

    /// Term `label` of the named vocabulary.
    pub fn term(&self, vocabulary: &str, label: &str) -> Result<OntologyTerm> {
        self.registry.vocabulary(vocabulary)?.term(label)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("classes", &self.registry.len())
            .field("cached", &self.cache.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
