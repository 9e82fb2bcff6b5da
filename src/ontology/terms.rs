use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::value_objects::Iri;
use crate::{
    document::{ID_KEY, LABEL_KEY},
    Error, Result,
};

/// Controlled vocabulary: a named table mapping term labels to IRIs.
///
/// Each vocabulary plays the role of one ontology term type (species, brain
/// region, cell type, ...). Terms built without an explicit IRI are looked up
/// in the table of their own vocabulary only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    name: String,
    #[serde(default)]
    terms: BTreeMap<String, Iri>,
}

impl Vocabulary {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terms: BTreeMap::new(),
        }
    }

    /// Adds a label to IRI mapping.
    #[must_use]
    pub fn with_term(mut self, label: impl Into<String>, iri: Iri) -> Self {
        self.terms.insert(label.into(), iri);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn iri_of(&self, label: &str) -> Option<&Iri> {
        self.terms.get(label)
    }

    /// Builds the term registered under `label`.
    pub fn term(&self, label: &str) -> Result<OntologyTerm> {
        OntologyTerm::new(self, label, None)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Immutable controlled-vocabulary value.
///
/// Terms are embedded in documents rather than stored as resources, so they
/// are never identity-cached. Two terms are equal when vocabulary, label and
/// IRI are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OntologyTerm {
    vocabulary: String,
    label: String,
    iri: Iri,
}

impl OntologyTerm {
    /// Creates a term, resolving the IRI from the vocabulary when omitted.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTerm`] when no IRI is given and the vocabulary does not
    /// know `label`.
    pub fn new(vocabulary: &Vocabulary, label: impl Into<String>, iri: Option<Iri>) -> Result<Self> {
        let label = label.into();
        let iri = match iri {
            Some(iri) => iri,
            None => vocabulary
                .iri_of(&label)
                .cloned()
                .ok_or_else(|| Error::UnknownTerm {
                    vocabulary: vocabulary.name().to_string(),
                    label: label.clone(),
                })?,
        };
        Ok(Self {
            vocabulary: vocabulary.name().to_string(),
            label,
            iri,
        })
    }

    #[must_use]
    pub fn vocabulary(&self) -> &str {
        &self.vocabulary
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn iri(&self) -> &Iri {
        &self.iri
    }

    /// Encodes the term as its two-field document form.
    #[must_use]
    pub fn encode(&self) -> Value {
        json!({
            ID_KEY: self.iri.as_str(),
            LABEL_KEY: self.label,
        })
    }

    /// Decodes a term of `vocabulary` from its document form.
    ///
    /// `null` decodes to `None`. The IRI is taken from the document as is; the
    /// label does not need to be part of the vocabulary table.
    pub fn decode(vocabulary: &Vocabulary, data: &Value) -> Result<Option<Self>> {
        let object = match data {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            other => {
                return Err(Error::malformed(format!(
                    "{} term must be an object, got {other}",
                    vocabulary.name()
                )))
            }
        };
        let field = |key: &str| {
            object.get(key).and_then(Value::as_str).ok_or_else(|| {
                Error::malformed(format!("{} term is missing `{key}`", vocabulary.name()))
            })
        };
        let iri = Iri::new(field(ID_KEY)?)?;
        let label = field(LABEL_KEY)?;
        Self::new(vocabulary, label, Some(iri)).map(Some)
    }
}

impl Display for OntologyTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}, {})", self.vocabulary, self.label, self.iri)
    }
}
