//! Knowledge objects and their persistence protocol.
//!
//! A [`KnowledgeObject`] is a property bag bound to an [`EntityClass`]. The
//! class decides which properties exist and how they map to document keys;
//! the object owns the create, update and exists protocol shared by every
//! class. Building the outgoing document ([`KnowledgeObject::build_document`])
//! is kept separate from deciding what to do with it
//! ([`KnowledgeObject::save_document`]).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    cardinality::{normalize, Link, OneOrMany},
    document::{Document, Filter, RawInstance, CONTEXT_KEY, ID_KEY, TYPE_KEY},
    ontology::{OntologyTerm, ResourceId},
    reference::{ProxyReference, QueryReference},
    registry::ClassRegistry,
    schema::{EntityClass, FieldSpec},
    session::Session,
    Error, Result,
};

pub type Properties = BTreeMap<String, FieldValue>;

/// Value held by a property.
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// Plain JSON value stored verbatim.
    Literal(Value),
    Term(OntologyTerm),
    Proxy(ProxyReference),
    /// Deferred query; never written back to the store.
    Query(QueryReference),
    /// Live object, serialized as a reference.
    Object(Arc<KnowledgeObject>),
    List(Vec<FieldValue>),
}

impl FieldValue {
    #[must_use]
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_literal().and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_term(&self) -> Option<&OntologyTerm> {
        match self {
            Self::Term(term) => Some(term),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_proxy(&self) -> Option<&ProxyReference> {
        match self {
            Self::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// The value as a list; a single value becomes a one-element slice.
    #[must_use]
    pub fn as_slice(&self) -> &[FieldValue] {
        match self {
            Self::List(items) => items,
            single => std::slice::from_ref(single),
        }
    }
}

impl From<Link> for FieldValue {
    fn from(link: Link) -> Self {
        match link {
            Link::Term(term) => Self::Term(term),
            Link::Proxy(proxy) => Self::Proxy(proxy),
        }
    }
}

impl<T: Into<FieldValue>> From<OneOrMany<T>> for FieldValue {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(item) => item.into(),
            OneOrMany::Many(items) => Self::List(items.into_iter().map(Into::into).collect()),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<OntologyTerm> for FieldValue {
    fn from(term: OntologyTerm) -> Self {
        Self::Term(term)
    }
}

impl From<ProxyReference> for FieldValue {
    fn from(proxy: ProxyReference) -> Self {
        Self::Proxy(proxy)
    }
}

impl From<QueryReference> for FieldValue {
    fn from(query: QueryReference) -> Self {
        Self::Query(query)
    }
}

impl From<Arc<KnowledgeObject>> for FieldValue {
    fn from(object: Arc<KnowledgeObject>) -> Self {
        Self::Object(object)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// One resource of the knowledge graph.
///
/// The identifier is write-once: it is unset for transient objects and, once
/// adopted from the store, never changes.
pub struct KnowledgeObject {
    class: Arc<EntityClass>,
    id: OnceLock<ResourceId>,
    instance: RwLock<Option<RawInstance>>,
    properties: RwLock<Properties>,
}

impl KnowledgeObject {
    /// Creates an object of `class`.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedProperty`] when a property is not declared by the
    /// class. Nothing is constructed in that case.
    pub fn new(
        class: Arc<EntityClass>,
        id: Option<ResourceId>,
        instance: Option<RawInstance>,
        properties: Properties,
    ) -> Result<Self> {
        if let Some(name) = properties.keys().find(|name| !class.declares(name)) {
            return Err(Error::UnexpectedProperty {
                class: class.name().to_string(),
                property: name.clone(),
            });
        }
        let cell = OnceLock::new();
        if let Some(id) = id {
            let _ = cell.set(id);
        }
        Ok(Self {
            class,
            id: cell,
            instance: RwLock::new(instance),
            properties: RwLock::new(properties),
        })
    }

    /// Builds an object from a fetched instance without consulting any cache.
    ///
    /// Uses the class decoder when one is set, the schema-driven
    /// [`decode_properties`] otherwise. Prefer
    /// [`Session::from_instance`], which memoizes this step.
    pub fn from_instance(
        class: Arc<EntityClass>,
        registry: &ClassRegistry,
        instance: RawInstance,
    ) -> Result<Self> {
        let id = instance.require_id()?;
        let decode = class.decoder().unwrap_or(decode_properties);
        let properties = decode(&class, registry, &instance)?;
        Self::new(class, Some(id), Some(instance), properties)
    }

    #[must_use]
    pub fn id(&self) -> Option<&ResourceId> {
        self.id.get()
    }

    #[must_use]
    pub fn class(&self) -> &Arc<EntityClass> {
        &self.class
    }

    #[must_use]
    pub fn type_tags(&self) -> &[String] {
        self.class.types()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.read_properties().get(name).cloned()
    }

    /// Sets a declared property, returning the previous value.
    pub fn set(&self, name: &str, value: impl Into<FieldValue>) -> Result<Option<FieldValue>> {
        if !self.class.declares(name) {
            return Err(Error::UnexpectedProperty {
                class: self.class.name().to_string(),
                property: name.to_string(),
            });
        }
        Ok(self.write_properties().insert(name.to_string(), value.into()))
    }

    /// Removes a property, returning its value.
    pub fn unset(&self, name: &str) -> Option<FieldValue> {
        self.write_properties().remove(name)
    }

    #[must_use]
    pub fn properties(&self) -> Properties {
        self.read_properties().clone()
    }

    /// Value of the class's name field, when it holds a string.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        let field = self.class.name_field()?;
        self.get(field)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Last document received from the store.
    #[must_use]
    pub fn instance(&self) -> Option<RawInstance> {
        self.instance
            .read()
            .expect("knowledge object snapshot poisoned")
            .clone()
    }

    /// Store revision of the last known snapshot.
    #[must_use]
    pub fn rev(&self) -> Option<u64> {
        self.instance
            .read()
            .expect("knowledge object snapshot poisoned")
            .as_ref()
            .and_then(RawInstance::revision)
    }

    /// Serializes the object into the document written on save.
    pub fn build_document(&self) -> Result<Document> {
        let encode = self.class.encoder().unwrap_or(encode_document);
        encode(self)
    }

    /// Checks whether the store already holds this object, adopting its
    /// identifier when it does.
    ///
    /// This is a resolve-or-check operation, not a pure predicate. With an
    /// identifier set it returns `true` without touching the store. Otherwise
    /// it searches the class collection for resources whose name equals this
    /// object's name. On exactly one match the match's identifier becomes
    /// this object's identifier and `true` is returned. No match, several
    /// matches, or an object without a name yield `false`.
    ///
    /// The filter uses the configured
    /// [`name_path`](crate::config::SessionSettings::name_path) when it
    /// addresses the class's name key, and the name key itself otherwise.
    pub async fn resolve_or_check(&self, session: &Session) -> Result<bool> {
        if self.id().is_some() {
            return Ok(true);
        }
        let Some(name) = self.name() else {
            debug!(class = self.class.name(), "no name to look up, assuming new");
            return Ok(false);
        };
        let settings = session.settings();
        let filter = Filter::equals(self.name_path(&settings.name_path), name.clone());
        let matches = session
            .store()
            .filter_query(self.class.path(), &filter, &settings.name_context)
            .await?;
        match matches.as_slice() {
            [] => Ok(false),
            [found] => {
                self.adopt_id(found.require_id()?);
                Ok(true)
            }
            several => {
                warn!(
                    class = self.class.name(),
                    name = %name,
                    matches = several.len(),
                    "name matches several resources, not adopting any"
                );
                Ok(false)
            }
        }
    }

    /// Saves the object: update when it has an identifier, create when no
    /// resource with its name exists.
    ///
    /// When the name matches an existing resource, the call is a no-op if
    /// `exists_ok`, and fails with [`Error::ResourceExists`] otherwise. With
    /// [`cascade_saves`](crate::config::SessionSettings::cascade_saves)
    /// enabled, referenced objects without an identifier are saved first.
    pub fn save<'a>(
        self: &'a Arc<Self>,
        session: &'a Session,
        exists_ok: bool,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut visited = Vec::new();
            let saved = self.save_cascading(session, exists_ok, &mut visited).await;
            saved
        })
    }

    /// `visited` holds every object this cascade has reached. Each is saved
    /// at most once; an unsaved back-edge of a reference cycle fails later
    /// with [`Error::UnsavedReference`].
    fn save_cascading<'a>(
        self: &'a Arc<Self>,
        session: &'a Session,
        exists_ok: bool,
        visited: &'a mut Vec<Arc<KnowledgeObject>>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            visited.push(Arc::clone(self));
            if session.settings().cascade_saves {
                for dependency in self.unsaved_references() {
                    let seen = visited.iter().any(|other| Arc::ptr_eq(other, &dependency));
                    if seen || dependency.id().is_some() {
                        continue;
                    }
                    dependency.save_cascading(session, true, visited).await?;
                }
            }
            let document = self.build_document()?;
            self.save_document(session, document, exists_ok).await
        })
    }

    /// Runs the create, update or no-op decision for an already built
    /// document.
    ///
    /// A failed create or update leaves the identifier as it was.
    pub async fn save_document(
        self: &Arc<Self>,
        session: &Session,
        document: Document,
        exists_ok: bool,
    ) -> Result<()> {
        if let Some(id) = self.id() {
            let mut current = match self.instance() {
                Some(instance) => instance,
                None => session.store().instance_from_full_uri(id).await?,
            };
            current.data_mut().extend(document);
            let updated = session.store().update_instance(current).await?;
            info!(class = self.class.name(), id = %id, "updating resource");
            self.replace_instance(updated);
            return Ok(());
        }

        if self.resolve_or_check(session).await? {
            if exists_ok {
                info!(
                    class = self.class.name(),
                    id = ?self.id().map(ResourceId::as_str),
                    "not updating, already exists"
                );
                return Ok(());
            }
            return Err(Error::ResourceExists {
                class: self.class.name().to_string(),
                name: self.name(),
            });
        }

        let created = session
            .store()
            .create_new_instance(self.class.path(), document)
            .await?;
        let id = created.require_id()?;
        self.adopt_id(id.clone());
        self.replace_instance(created);
        session.cache().put(id.clone(), Arc::clone(self));
        info!(class = self.class.name(), id = %id, "created resource");
        Ok(())
    }

    /// Filter path of the class's name field. The configured name path is
    /// used when its local part is the field's document key.
    fn name_path(&self, configured: &str) -> String {
        let key = self
            .class
            .name_field()
            .and_then(|name| self.class.field(name))
            .map_or("name", FieldSpec::key);
        let local = configured.rsplit_once(':').map_or(configured, |(_, local)| local);
        if key == configured || key == local {
            configured.to_string()
        } else {
            key.to_string()
        }
    }

    fn adopt_id(&self, id: ResourceId) {
        if let Err(rejected) = self.id.set(id) {
            warn!(
                class = self.class.name(),
                rejected = %rejected,
                "identifier already assigned, keeping the first one"
            );
        }
    }

    fn replace_instance(&self, instance: RawInstance) {
        *self
            .instance
            .write()
            .expect("knowledge object snapshot poisoned") = Some(instance);
    }

    fn unsaved_references(&self) -> Vec<Arc<KnowledgeObject>> {
        fn collect(value: &FieldValue, found: &mut Vec<Arc<KnowledgeObject>>) {
            match value {
                FieldValue::Object(object) if object.id().is_none() => {
                    if !found.iter().any(|other| Arc::ptr_eq(other, object)) {
                        found.push(Arc::clone(object));
                    }
                }
                FieldValue::List(items) => {
                    for item in items {
                        collect(item, found);
                    }
                }
                _ => {}
            }
        }

        let mut found = Vec::new();
        for value in self.read_properties().values() {
            collect(value, &mut found);
        }
        found
    }

    fn read_properties(&self) -> RwLockReadGuard<'_, Properties> {
        self.properties
            .read()
            .expect("knowledge object properties poisoned")
    }

    fn write_properties(&self) -> RwLockWriteGuard<'_, Properties> {
        self.properties
            .write()
            .expect("knowledge object properties poisoned")
    }
}

impl fmt::Debug for KnowledgeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({:?} {:?})",
            self.class.name(),
            self.name(),
            self.id().map(ResourceId::as_str)
        )
    }
}

/// Schema-driven construct-from-document step.
///
/// Requires the class's primary type among the document's `@type` values.
/// Literal fields are copied; linked fields are normalized into terms or
/// unresolved proxies. Absent optional fields are skipped.
pub fn decode_properties(
    class: &EntityClass,
    registry: &ClassRegistry,
    instance: &RawInstance,
) -> Result<Properties> {
    if let Some(expected) = class.primary_type() {
        if !instance.has_type(expected) {
            return Err(Error::TypeMismatch {
                class: class.name().to_string(),
                expected: expected.to_string(),
            });
        }
    }

    let mut properties = Properties::new();
    for field in class.fields() {
        let raw = instance.data().get(field.key()).filter(|raw| !raw.is_null());
        let Some(raw) = raw else {
            if field.is_required() {
                return Err(Error::MissingField {
                    class: class.name().to_string(),
                    field: field.name().to_string(),
                });
            }
            continue;
        };
        let value = match field.linked_class() {
            None => Some(FieldValue::Literal(raw.clone())),
            Some(target) => normalize(registry.lookup(target)?, Some(raw))?.map(FieldValue::from),
        };
        if let Some(value) = value {
            properties.insert(field.name().to_string(), value);
        }
    }
    Ok(properties)
}

/// Schema-driven serialize step.
///
/// Writes the class context and type tags, then every set property under its
/// document key. Terms are embedded, references and live objects are written
/// as `{"@type", "@id"}` pairs, and queries are skipped.
///
/// # Errors
///
/// [`Error::UnsavedReference`] when a referenced object has no identifier.
pub fn encode_document(object: &KnowledgeObject) -> Result<Document> {
    let class = object.class();
    let mut document = Document::new();
    if !class.context().is_null() {
        document.insert(CONTEXT_KEY.to_string(), class.context().clone());
    }
    document.insert(TYPE_KEY.to_string(), json!(class.types()));

    let properties = object.properties();
    for field in class.fields() {
        let Some(value) = properties.get(field.name()) else {
            continue;
        };
        if let Some(encoded) = encode_value(class, field, value)? {
            document.insert(field.key().to_string(), encoded);
        }
    }
    Ok(document)
}

fn encode_value(class: &EntityClass, field: &FieldSpec, value: &FieldValue) -> Result<Option<Value>> {
    let encoded = match value {
        FieldValue::Literal(Value::Null) | FieldValue::Query(_) => None,
        FieldValue::Literal(value) => Some(value.clone()),
        FieldValue::Term(term) => Some(term.encode()),
        FieldValue::Proxy(proxy) => Some(reference(proxy.type_tags(), proxy.id())),
        FieldValue::Object(object) => {
            let id = object.id().ok_or_else(|| Error::UnsavedReference {
                class: class.name().to_string(),
                field: field.name().to_string(),
            })?;
            Some(reference(object.type_tags(), id))
        }
        FieldValue::List(items) => {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                if let Some(value) = encode_value(class, field, item)? {
                    encoded.push(value);
                }
            }
            Some(Value::Array(encoded))
        }
    };
    Ok(encoded)
}

fn reference(types: &[String], id: &ResourceId) -> Value {
    json!({
        TYPE_KEY: types,
        ID_KEY: id.as_str(),
    })
}
