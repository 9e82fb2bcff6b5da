//! Cardinality normalization.
//!
//! JSON-LD documents store a single linked value as a bare object and several
//! as an array, optionally wrapped in `{"@list": [...]}`. [`normalize`] turns
//! any of these shapes into [`OneOrMany`] links so mapping code handles a
//! single shape.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    document::{ID_KEY, LIST_KEY},
    ontology::{OntologyTerm, ResourceId},
    reference::ProxyReference,
    registry::ClassDescriptor,
    Error, Result,
};

/// One value or a sequence of values.
///
/// Exactly one element is always represented as [`OneOrMany::One`]; zero or
/// two and more elements as [`OneOrMany::Many`]. Callers that want a sequence
/// regardless should use [`OneOrMany::into_vec`].
#[derive(Clone, Debug, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Collapses a one-element vector to [`OneOrMany::One`].
    #[must_use]
    pub fn from_vec(mut items: Vec<T>) -> Self {
        if items.len() == 1 {
            if let Some(item) = items.pop() {
                return Self::One(item);
            }
        }
        Self::Many(items)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn as_one(&self) -> Option<&T> {
        match self {
            Self::One(item) => Some(item),
            Self::Many(_) => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(item) => std::slice::from_ref(item).iter(),
            Self::Many(items) => items.iter(),
        }
    }

    #[must_use]
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> OneOrMany<U> {
        match self {
            Self::One(item) => OneOrMany::One(f(item)),
            Self::Many(items) => OneOrMany::Many(items.into_iter().map(f).collect()),
        }
    }
}

/// An element produced by normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum Link {
    /// Embedded vocabulary value, decoded eagerly.
    Term(OntologyTerm),
    /// Pointer to another resource, left unresolved.
    Proxy(ProxyReference),
}

/// Normalizes a raw document fragment linking to `target`.
///
/// Missing and `null` fragments yield `None`. A `{"@list": [...]}` wrapper is
/// unwrapped and a bare object is treated as a one-element list. Elements
/// become [`Link::Term`] for vocabulary targets and unresolved
/// [`Link::Proxy`] references for entity targets.
///
/// # Errors
///
/// [`Error::UnsupportedTarget`] when `target` is an embedded value type, and
/// [`Error::MalformedFragment`] when the fragment is a scalar, an `@list`
/// wrapper with extra keys or a non-array payload, or an entity element
/// without `@id`.
pub fn normalize(target: &ClassDescriptor, raw: Option<&Value>) -> Result<Option<OneOrMany<Link>>> {
    let Some(value) = raw else {
        return Ok(None);
    };
    let items = match value {
        Value::Null => return Ok(None),
        Value::Array(items) => items.as_slice(),
        Value::Object(object) => match object.get(LIST_KEY) {
            Some(_) if object.len() > 1 => {
                return Err(Error::malformed("`@list` wrapper carries extra keys"))
            }
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => return Err(Error::malformed("`@list` must hold an array")),
            None => std::slice::from_ref(value),
        },
        other => {
            return Err(Error::malformed(format!(
                "expected an object or a list, got {other}"
            )))
        }
    };

    let links = match target {
        ClassDescriptor::Vocabulary(vocabulary) => items
            .iter()
            .map(|item| {
                OntologyTerm::decode(vocabulary, item)?
                    .map(Link::Term)
                    .ok_or_else(|| Error::malformed("null term inside a list"))
            })
            .collect::<Result<Vec<_>>>()?,
        ClassDescriptor::Entity(class) => items
            .iter()
            .map(|item| {
                let id = item
                    .get(ID_KEY)
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::malformed(format!("{} reference without `@id`", class.name()))
                    })?;
                Ok(Link::Proxy(ProxyReference::new(
                    Arc::clone(class),
                    ResourceId::from(id),
                )))
            })
            .collect::<Result<Vec<_>>>()?,
        ClassDescriptor::Embedded(name) => {
            return Err(Error::UnsupportedTarget {
                class: name.clone(),
            })
        }
    };

    Ok(Some(OneOrMany::from_vec(links)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;
    use serde_json::{json, Value};

    use super::{normalize, Link, OneOrMany};
    use crate::{
        ontology::{Iri, Vocabulary},
        registry::ClassDescriptor,
        schema::EntityClass,
        Error,
    };

    fn person() -> ClassDescriptor {
        ClassDescriptor::Entity(Arc::new(EntityClass::new(
            "Person",
            "neuralactivity/core/person/v0.1.0",
            ["nsg:Person"],
        )))
    }

    fn brain_region() -> ClassDescriptor {
        ClassDescriptor::Vocabulary(Arc::new(Vocabulary::new("BrainRegion").with_term(
            "hippocampus",
            Iri::new("http://purl.obolibrary.org/obo/UBERON_0001954").expect("iri"),
        )))
    }

    fn proxy_id(link: &Link) -> &str {
        match link {
            Link::Proxy(proxy) => proxy.id().as_str(),
            Link::Term(term) => panic!("expected a proxy, got {term}"),
        }
    }

    #[test]
    fn null_and_missing_normalize_to_none() {
        assert!(normalize(&person(), None).expect("missing").is_none());
        assert!(normalize(&person(), Some(&Value::Null))
            .expect("null")
            .is_none());
    }

    #[rstest]
    #[case::bare(json!({"@id": "https://kg.example.org/person/1", "@type": "nsg:Person"}))]
    #[case::array(json!([{"@id": "https://kg.example.org/person/1"}]))]
    #[case::list_wrapper(json!({"@list": [{"@id": "https://kg.example.org/person/1"}]}))]
    fn single_entries_collapse_to_one(#[case] raw: Value) {
        let links = normalize(&person(), Some(&raw))
            .expect("normalize")
            .expect("some");
        let OneOrMany::One(link) = &links else {
            panic!("expected a single link, got {links:?}");
        };
        assert_eq!(proxy_id(link), "https://kg.example.org/person/1");
    }

    #[rstest]
    #[case::array(json!([{"@id": "https://kg.example.org/person/1"}, {"@id": "https://kg.example.org/person/2"}]))]
    #[case::list_wrapper(json!({"@list": [{"@id": "https://kg.example.org/person/1"}, {"@id": "https://kg.example.org/person/2"}]}))]
    fn multiple_entries_stay_a_sequence(#[case] raw: Value) {
        let links = normalize(&person(), Some(&raw))
            .expect("normalize")
            .expect("some");
        assert_eq!(links.len(), 2);
        let ids: Vec<_> = links.iter().map(proxy_id).collect();
        assert_eq!(
            ids,
            vec![
                "https://kg.example.org/person/1",
                "https://kg.example.org/person/2"
            ]
        );
    }

    #[test]
    fn proxies_expose_type_without_resolving() {
        let raw = json!({"@id": "https://kg.example.org/person/1"});
        let links = normalize(&person(), Some(&raw))
            .expect("normalize")
            .expect("some");
        let Some(Link::Proxy(proxy)) = links.as_one() else {
            panic!("expected proxy");
        };
        assert_eq!(proxy.type_tags(), ["nsg:Person".to_string()]);
    }

    #[test]
    fn vocabulary_targets_decode_terms() {
        let raw = json!({"@id": "http://purl.obolibrary.org/obo/UBERON_0001954", "label": "hippocampus"});
        let links = normalize(&brain_region(), Some(&raw))
            .expect("normalize")
            .expect("some");
        let Some(Link::Term(term)) = links.as_one() else {
            panic!("expected term");
        };
        assert_eq!(term.label(), "hippocampus");
        assert_eq!(term.vocabulary(), "BrainRegion");
    }

    #[test]
    fn empty_list_is_an_empty_sequence() {
        let links = normalize(&person(), Some(&json!([])))
            .expect("normalize")
            .expect("some");
        assert!(links.is_empty());
        assert!(matches!(links, OneOrMany::Many(_)));
    }

    #[test]
    fn embedded_targets_are_unsupported() {
        let target = ClassDescriptor::Embedded("Distribution".to_string());
        let err = normalize(&target, Some(&json!({"downloadURL": "file.swc"})))
            .expect_err("embedded");
        assert!(matches!(err, Error::UnsupportedTarget { class } if class == "Distribution"));
    }

    #[rstest]
    #[case::string(json!("https://kg.example.org/person/1"))]
    #[case::number(json!(42))]
    #[case::wrapper_with_extra_keys(json!({"@list": [], "@type": "nsg:Person"}))]
    #[case::wrapper_without_array(json!({"@list": {"@id": "https://kg.example.org/person/1"}}))]
    #[case::reference_without_id(json!({"@type": "nsg:Person"}))]
    fn malformed_fragments_are_rejected(#[case] raw: Value) {
        let err = normalize(&person(), Some(&raw)).expect_err("malformed");
        assert!(matches!(err, Error::MalformedFragment(_)));
    }

    #[test]
    fn one_or_many_helpers() {
        assert_eq!(OneOrMany::from_vec(vec![1]), OneOrMany::One(1));
        assert_eq!(OneOrMany::from_vec(vec![1, 2]).into_vec(), vec![1, 2]);
        assert_eq!(OneOrMany::One(2).map(|n| n * 10), OneOrMany::One(20));
        assert_eq!(
            OneOrMany::Many(vec![1, 2]).map(|n| n + 1),
            OneOrMany::Many(vec![2, 3])
        );
    }
}
