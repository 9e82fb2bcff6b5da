//! Entity class declarations.
//!
//! Concrete entity types are data, not code: an [`EntityClass`] names the
//! collection a type lives in, its JSON-LD type tags and context, and the
//! mapping between property names and document keys. Classes are declared
//! programmatically or loaded from a YAML [`Catalog`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::{Document, RawInstance},
    object::{KnowledgeObject, Properties},
    registry::ClassRegistry,
    Error, Result,
};

pub mod catalog;

pub use catalog::Catalog;

/// Builds the properties of an object from a fetched instance.
pub type Decoder = fn(&EntityClass, &ClassRegistry, &RawInstance) -> Result<Properties>;

/// Builds the outgoing document of an object.
pub type Encoder = fn(&KnowledgeObject) -> Result<Document>;

/// Mapping of one property to a document key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    name: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    required: bool,
}

impl FieldSpec {
    /// A field holding a plain JSON value stored under `key`.
    #[must_use]
    pub fn literal(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: Some(key.into()),
            link: None,
            required: false,
        }
    }

    /// A field linking to another registered class: an entity class (stored as
    /// references) or a vocabulary (stored as embedded terms).
    #[must_use]
    pub fn link(name: impl Into<String>, key: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: Some(key.into()),
            link: Some(class.into()),
            required: false,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Document key; defaults to the property name.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// Name of the linked class, `None` for literal fields.
    #[must_use]
    pub fn linked_class(&self) -> Option<&str> {
        self.link.as_deref()
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Declaration of one entity type of the knowledge graph.
#[derive(Clone, Serialize, Deserialize)]
pub struct EntityClass {
    name: String,
    path: String,
    types: Vec<String>,
    #[serde(default)]
    context: Value,
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    name_field: Option<String>,
    #[serde(skip)]
    decoder: Option<Decoder>,
    #[serde(skip)]
    encoder: Option<Encoder>,
}

impl EntityClass {
    /// Declares a class stored under collection `path` with the given type
    /// tags. The last tag is the primary type checked on decoding.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            types: types.into_iter().map(Into::into).collect(),
            context: Value::Null,
            fields: Vec::new(),
            name_field: None,
            decoder: None,
            encoder: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Selects the property used for name lookups.
    #[must_use]
    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = Some(field.into());
        self
    }

    /// Replaces the schema-driven construct-from-document step.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Replaces the schema-driven serialize step.
    #[must_use]
    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    #[must_use]
    pub fn primary_type(&self) -> Option<&str> {
        self.types.last().map(String::as_str)
    }

    #[must_use]
    pub fn context(&self) -> &Value {
        &self.context
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Property used for name lookups: the configured one, else `name` when
    /// declared.
    #[must_use]
    pub fn name_field(&self) -> Option<&str> {
        match &self.name_field {
            Some(field) => Some(field.as_str()),
            None if self.declares("name") => Some("name"),
            None => None,
        }
    }

    pub(crate) fn decoder(&self) -> Option<Decoder> {
        self.decoder
    }

    pub(crate) fn encoder(&self) -> Option<Encoder> {
        self.encoder
    }

    /// Checks the declaration is usable: at least one type tag, unique
    /// property names and keys, and a declared name field.
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(Error::Config(format!(
                "class `{}` declares no type tags",
                self.name
            )));
        }
        let mut names = BTreeSet::new();
        let mut keys = BTreeSet::new();
        for field in &self.fields {
            if !names.insert(field.name()) {
                return Err(Error::Config(format!(
                    "class `{}` declares field `{}` twice",
                    self.name,
                    field.name()
                )));
            }
            if !keys.insert(field.key()) {
                return Err(Error::Config(format!(
                    "class `{}` maps two fields to key `{}`",
                    self.name,
                    field.key()
                )));
            }
        }
        if let Some(field) = &self.name_field {
            if !self.declares(field) {
                return Err(Error::Config(format!(
                    "class `{}` uses undeclared field `{field}` as its name",
                    self.name
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityClass")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("types", &self.types)
            .field("fields", &self.fields)
            .field("custom_decoder", &self.decoder.is_some())
            .field("custom_encoder", &self.encoder.is_some())
            .finish_non_exhaustive()
    }
}
