//! Error types shared by the mapping layer.
//!
//! Every fallible operation of the crate returns [`Error`]. Failures raised by
//! a [`KnowledgeStore`](crate::store::KnowledgeStore) are wrapped without
//! modification so callers can still match on the original [`StoreError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::{ontology::IriError, store::StoreError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A property that the class schema does not declare was supplied.
    #[error("{class} got an unexpected property `{property}`")]
    UnexpectedProperty { class: String, property: String },

    /// Creation was refused because a resource with the same name exists.
    #[error("already exists in the knowledge graph: {class}({name:?})")]
    ResourceExists { class: String, name: Option<String> },

    /// No class was registered under the given name.
    #[error("no class registered under `{0}`")]
    UnknownClass(String),

    /// The label is missing from the vocabulary's label table.
    #[error("`{label}` is not a known term of vocabulary `{vocabulary}`")]
    UnknownTerm { vocabulary: String, label: String },

    /// A class was registered twice.
    #[error("class `{0}` is already registered")]
    DuplicateClass(String),

    /// The registered class is not an entity class.
    #[error("`{0}` is not an entity class")]
    NotAnEntity(String),

    /// The registered class is not a vocabulary.
    #[error("`{0}` is not a vocabulary")]
    NotAVocabulary(String),

    /// Normalization target is neither an entity class nor a vocabulary.
    #[error("cannot build references of `{class}`: not an entity class or vocabulary")]
    UnsupportedTarget { class: String },

    /// The raw document fragment does not have a supported shape.
    #[error("malformed document fragment: {0}")]
    MalformedFragment(String),

    /// The document does not declare the type expected by the class.
    #[error("document is not a `{expected}` as required by {class}")]
    TypeMismatch { class: String, expected: String },

    /// A required field is absent from the fetched document.
    #[error("{class} document is missing required field `{field}`")]
    MissingField { class: String, field: String },

    /// A referenced object has no identifier and cannot be serialized.
    #[error("{class}.{field} references an object that has not been saved")]
    UnsavedReference { class: String, field: String },

    /// The store returned an instance without an `@id`.
    #[error("instance has no identifier")]
    MissingIdentifier,

    #[error(transparent)]
    Iri(#[from] IriError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl Error {
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFragment(reason.into())
    }
}
