//! Identity-cached object mapping for JSON-LD knowledge graph stores.
//!
//! Entity classes are declared as data ([`schema::EntityClass`]) and
//! registered once in a [`registry::ClassRegistry`]. A [`session::Session`]
//! binds the registry to a [`store::KnowledgeStore`] and an identity cache,
//! and hands out [`object::KnowledgeObject`]s that can be saved back with
//! create, update or exists semantics.

pub mod cache;
pub mod cardinality;
pub mod config;
pub mod document;
mod errors;
pub mod object;
pub mod ontology;
pub mod reference;
pub mod registry;
pub mod schema;
pub mod session;
pub mod store;

pub use errors::{Error, Result};
