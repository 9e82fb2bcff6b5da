//! Document format contract shared with the knowledge store.
//!
//! Documents are JSON-LD objects. The mapping layer only interprets the
//! reserved keys declared here; every other key belongs to an entity class and
//! is described by its [`FieldSpec`](crate::schema::FieldSpec).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ontology::ResourceId, Error, Result};

pub const ID_KEY: &str = "@id";
pub const TYPE_KEY: &str = "@type";
pub const CONTEXT_KEY: &str = "@context";
pub const LIST_KEY: &str = "@list";
pub const LABEL_KEY: &str = "label";
pub const REVISION_KEY: &str = "nxv:rev";

pub type Document = Map<String, Value>;

/// A resource as returned by the store: its document, including `@id`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInstance {
    data: Document,
}

impl RawInstance {
    #[must_use]
    pub fn new(data: Document) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn data(&self) -> &Document {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Document {
        &mut self.data
    }

    #[must_use]
    pub fn into_data(self) -> Document {
        self.data
    }

    #[must_use]
    pub fn id(&self) -> Option<ResourceId> {
        self.data
            .get(ID_KEY)
            .and_then(Value::as_str)
            .map(ResourceId::from)
    }

    /// Returns the identifier, failing when the store omitted it.
    pub fn require_id(&self) -> Result<ResourceId> {
        self.id().ok_or(Error::MissingIdentifier)
    }

    /// Type tags declared under `@type`, whether given as a string or a list.
    #[must_use]
    pub fn type_tags(&self) -> Vec<&str> {
        match self.data.get(TYPE_KEY) {
            Some(Value::String(tag)) => vec![tag.as_str()],
            Some(Value::Array(tags)) => tags.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn has_type(&self, tag: &str) -> bool {
        self.type_tags().contains(&tag)
    }

    #[must_use]
    pub fn revision(&self) -> Option<u64> {
        self.data.get(REVISION_KEY).and_then(Value::as_u64)
    }
}

impl From<Document> for RawInstance {
    fn from(data: Document) -> Self {
        Self::new(data)
    }
}

/// Comparison applied by a filter condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    In,
}

/// Boolean combination of nested filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOp {
    And,
    Or,
}

/// Filter expression in the store's `{"path", "op", "value"}` form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Condition {
        path: String,
        op: FilterOp,
        value: Value,
    },
    Group {
        op: GroupOp,
        value: Vec<Filter>,
    },
}

impl Filter {
    #[must_use]
    pub fn equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Condition {
            path: path.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn not_equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Condition {
            path: path.into(),
            op: FilterOp::Ne,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn one_of(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::Condition {
            path: path.into(),
            op: FilterOp::In,
            value: Value::Array(values),
        }
    }

    #[must_use]
    pub fn all(filters: Vec<Filter>) -> Self {
        Self::Group {
            op: GroupOp::And,
            value: filters,
        }
    }

    #[must_use]
    pub fn any(filters: Vec<Filter>) -> Self {
        Self::Group {
            op: GroupOp::Or,
            value: filters,
        }
    }

    /// Evaluates the filter against a document.
    ///
    /// A condition path such as `schema:name` matches the document key
    /// `schema:name` or, failing that, its local part `name`. Reference values
    /// (`{"@id": ...}`) match on their identifier, and lists, including
    /// `@list` wrappers, match when any element does.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::Condition { path, op, value } => {
                let actual = lookup_path(document, path);
                match op {
                    FilterOp::Eq => actual.is_some_and(|actual| value_matches(actual, value)),
                    FilterOp::Ne => !actual.is_some_and(|actual| value_matches(actual, value)),
                    FilterOp::In => match (actual, value) {
                        (Some(actual), Value::Array(candidates)) => candidates
                            .iter()
                            .any(|candidate| value_matches(actual, candidate)),
                        _ => false,
                    },
                }
            }
            Self::Group {
                op: GroupOp::And,
                value,
            } => value.iter().all(|filter| filter.matches(document)),
            Self::Group {
                op: GroupOp::Or,
                value,
            } => value.iter().any(|filter| filter.matches(document)),
        }
    }
}

fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    document.get(path).or_else(|| {
        path.rsplit_once(':')
            .and_then(|(_, local)| document.get(local))
    })
}

fn value_matches(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match actual {
        Value::Array(items) => items.iter().any(|item| value_matches(item, expected)),
        Value::Object(object) => match object.get(LIST_KEY) {
            Some(list) => value_matches(list, expected),
            None => object.get(ID_KEY).is_some_and(|id| id == expected),
        },
        _ => false,
    }
}
