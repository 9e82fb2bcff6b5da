//! Ontology primitives: validated IRIs, resource identifiers and controlled
//! vocabulary terms.

pub mod terms;
pub mod value_objects;

pub use terms::{OntologyTerm, Vocabulary};
pub use value_objects::{Iri, IriError, ResourceId};
