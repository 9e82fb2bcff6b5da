#![allow(dead_code)]

use std::sync::Arc;

use kg_mapper::{
    document::Document,
    object::{FieldValue, Properties},
    registry::ClassRegistry,
    schema::Catalog,
    session::Session,
    store::InMemoryStore,
};
use serde_json::Value;

pub const PEOPLE: &str = "neuralactivity/core/person/v0.1.0";
pub const ORGANIZATIONS: &str = "neuralactivity/core/organization/v0.1.0";
pub const PROJECTS: &str = "neuralactivity/simulation/modelproject/v0.1.0";

pub const CATALOG: &str = r#"
entities:
  - name: Person
    path: neuralactivity/core/person/v0.1.0
    types: ["nsg:Person"]
    context:
      schema: http://schema.org/
    fields:
      - name: name
        required: true
      - name: email
      - name: affiliation
        link: Organization
  - name: Organization
    path: neuralactivity/core/organization/v0.1.0
    types: ["nsg:Organization"]
    fields:
      - name: name
        required: true
      - name: head
        link: Person
  - name: ModelProject
    path: neuralactivity/simulation/modelproject/v0.1.0
    types: ["prov:Entity", "nsg:ModelProject"]
    context:
      schema: http://schema.org/
      prov: http://www.w3.org/ns/prov#
    fields:
      - name: name
        required: true
      - name: description
      - name: private
      - name: owners
        key: owner
        link: Person
      - name: organization
        link: Organization
      - name: brain_region
        key: brainRegion
        link: BrainRegion
vocabularies:
  - name: BrainRegion
    terms:
      hippocampus: http://purl.obolibrary.org/obo/UBERON_0001954
      cerebellum: http://purl.obolibrary.org/obo/UBERON_0002037
"#;

pub fn registry() -> Arc<ClassRegistry> {
    let registry = Catalog::from_yaml(CATALOG)
        .expect("catalog parses")
        .into_registry()
        .expect("catalog registers");
    Arc::new(registry)
}

pub fn session() -> (Arc<InMemoryStore>, Session) {
    let store = Arc::new(InMemoryStore::new("https://kg.example.org/data"));
    let session = Session::new(registry(), store.clone());
    (store, session)
}

pub fn document(value: Value) -> Document {
    value.as_object().cloned().expect("document must be an object")
}

pub fn properties<V: Into<FieldValue>>(
    pairs: impl IntoIterator<Item = (&'static str, V)>,
) -> Properties {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.into()))
        .collect()
}
