//! Lazy references to resources.
//!
//! Links found in fetched documents are not followed eagerly. They become
//! [`ProxyReference`]s (one resource by identifier) or, for reverse links
//! that need a search, [`QueryReference`]s. Both resolve through the
//! session's identity cache, so any path to an identifier yields the same
//! object.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::{
    cardinality::OneOrMany,
    document::Filter,
    object::KnowledgeObject,
    ontology::ResourceId,
    schema::EntityClass,
    session::Session,
    Result,
};

/// Unresolved pointer to a resource of a known class.
#[derive(Clone)]
pub struct ProxyReference {
    class: Arc<EntityClass>,
    id: ResourceId,
}

impl ProxyReference {
    #[must_use]
    pub fn new(class: Arc<EntityClass>, id: ResourceId) -> Self {
        Self { class, id }
    }

    #[must_use]
    pub fn class(&self) -> &Arc<EntityClass> {
        &self.class
    }

    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Type tags of the referenced class. Does not touch the store.
    #[must_use]
    pub fn type_tags(&self) -> &[String] {
        self.class.types()
    }

    /// Returns the referenced object, loading it on first use.
    ///
    /// Idempotent: once resolved, the cached instance is returned without
    /// another store round trip.
    pub async fn resolve(&self, session: &Session) -> Result<Arc<KnowledgeObject>> {
        if let Some(object) = session.cache().get(&self.id) {
            debug!(class = self.class.name(), id = %self.id, "proxy resolved from cache");
            return Ok(object);
        }
        let object = session.from_uri(&self.class, &self.id).await?;
        Ok(session.cache().insert_if_absent(self.id.clone(), object))
    }
}

impl PartialEq for ProxyReference {
    fn eq(&self, other: &Self) -> bool {
        self.class.name() == other.class.name() && self.id == other.id
    }
}

impl fmt::Debug for ProxyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProxyReference({}, {:?})", self.class.name(), self.id.as_str())
    }
}

/// Deferred filtered query against a class's collection.
#[derive(Clone)]
pub struct QueryReference {
    class: Arc<EntityClass>,
    filter: Filter,
    context: Value,
}

impl QueryReference {
    #[must_use]
    pub fn new(class: Arc<EntityClass>, filter: Filter, context: Value) -> Self {
        Self {
            class,
            filter,
            context,
        }
    }

    #[must_use]
    pub fn class(&self) -> &Arc<EntityClass> {
        &self.class
    }

    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Runs the query and maps every match through the caching factory.
    ///
    /// Returns [`OneOrMany::One`] when exactly one resource matched and
    /// [`OneOrMany::Many`] otherwise, including when nothing matched. The
    /// query itself is executed on every call; only its results are cached.
    pub async fn resolve(&self, session: &Session) -> Result<OneOrMany<Arc<KnowledgeObject>>> {
        let instances = session
            .store()
            .filter_query(self.class.path(), &self.filter, &self.context)
            .await?;
        debug!(
            class = self.class.name(),
            matches = instances.len(),
            "query resolved"
        );
        let objects = instances
            .into_iter()
            .map(|instance| session.from_instance(&self.class, instance))
            .collect::<Result<Vec<_>>>()?;
        Ok(OneOrMany::from_vec(objects))
    }
}

impl fmt::Debug for QueryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryReference")
            .field("class", &self.class.name())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
