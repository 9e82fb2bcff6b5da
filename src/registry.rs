//! Name to class descriptor table.
//!
//! Classes refer to each other by name (a field of `ModelInstance` links to
//! `ModelScript`, which may be declared later). The registry is filled once
//! during initialization, then shared read-only by a [`Session`](crate::session::Session).

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::{ontology::Vocabulary, schema::EntityClass, Error, Result};

/// What a registered name stands for.
#[derive(Clone, Debug)]
pub enum ClassDescriptor {
    /// A persisted entity type, referenced through proxies.
    Entity(Arc<EntityClass>),
    /// An ontology term type, embedded by value.
    Vocabulary(Arc<Vocabulary>),
    /// A structured value type that is neither, such as a file distribution.
    Embedded(String),
}

impl ClassDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Entity(class) => class.name(),
            Self::Vocabulary(vocabulary) => vocabulary.name(),
            Self::Embedded(name) => name,
        }
    }
}

impl From<EntityClass> for ClassDescriptor {
    fn from(class: EntityClass) -> Self {
        Self::Entity(Arc::new(class))
    }
}

impl From<Vocabulary> for ClassDescriptor {
    fn from(vocabulary: Vocabulary) -> Self {
        Self::Vocabulary(Arc::new(vocabulary))
    }
}

#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<String, ClassDescriptor>,
}

impl ClassRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a descriptor under its name.
    ///
    /// Names share one flat namespace; a second registration of the same name
    /// fails with [`Error::DuplicateClass`].
    pub fn register(&mut self, descriptor: impl Into<ClassDescriptor>) -> Result<()> {
        let descriptor = descriptor.into();
        if let ClassDescriptor::Entity(class) = &descriptor {
            class.validate()?;
        }
        let name = descriptor.name().to_string();
        if self.classes.contains_key(&name) {
            return Err(Error::DuplicateClass(name));
        }
        debug!(class = %name, "registered class");
        self.classes.insert(name, descriptor);
        Ok(())
    }

    pub fn register_entity(&mut self, class: EntityClass) -> Result<()> {
        self.register(class)
    }

    pub fn register_vocabulary(&mut self, vocabulary: Vocabulary) -> Result<()> {
        self.register(vocabulary)
    }

    pub fn register_embedded(&mut self, name: impl Into<String>) -> Result<()> {
        self.register(ClassDescriptor::Embedded(name.into()))
    }

    /// Returns the descriptor registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&ClassDescriptor> {
        self.classes
            .get(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    /// Returns the entity class registered under `name`.
    pub fn entity(&self, name: &str) -> Result<Arc<EntityClass>> {
        match self.lookup(name)? {
            ClassDescriptor::Entity(class) => Ok(Arc::clone(class)),
            _ => Err(Error::NotAnEntity(name.to_string())),
        }
    }

    /// Returns the vocabulary registered under `name`.
    pub fn vocabulary(&self, name: &str) -> Result<Arc<Vocabulary>> {
        match self.lookup(name)? {
            ClassDescriptor::Vocabulary(vocabulary) => Ok(Arc::clone(vocabulary)),
            _ => Err(Error::NotAVocabulary(name.to_string())),
        }
    }

    /// Verifies every field link names a registered class.
    pub fn check_links(&self) -> Result<()> {
        for descriptor in self.classes.values() {
            let ClassDescriptor::Entity(class) = descriptor else {
                continue;
            };
            for target in class.fields().iter().filter_map(|field| field.linked_class()) {
                self.lookup(target)?;
            }
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassDescriptor, ClassRegistry};
    use crate::{
        ontology::Vocabulary,
        schema::{EntityClass, FieldSpec},
        Error,
    };

    fn person() -> EntityClass {
        EntityClass::new("Person", "neuralactivity/core/person/v0.1.0", ["nsg:Person"])
            .with_field(FieldSpec::literal("name", "schema:name"))
    }

    #[test]
    fn lookup_returns_registered_descriptors() {
        let mut registry = ClassRegistry::new();
        registry.register_entity(person()).expect("person");
        registry
            .register_vocabulary(Vocabulary::new("Species"))
            .expect("species");
        registry.register_embedded("Distribution").expect("distribution");

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["Distribution", "Person", "Species"]
        );
        assert_eq!(registry.entity("Person").expect("entity").name(), "Person");
        assert!(matches!(
            registry.lookup("Distribution"),
            Ok(ClassDescriptor::Embedded(name)) if name == "Distribution"
        ));
        assert!(matches!(
            registry.entity("Species"),
            Err(Error::NotAnEntity(name)) if name == "Species"
        ));
        assert!(matches!(
            registry.vocabulary("Person"),
            Err(Error::NotAVocabulary(name)) if name == "Person"
        ));
    }

    #[test]
    fn unknown_names_are_lookup_errors() {
        let registry = ClassRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.lookup("Organization"),
            Err(Error::UnknownClass(name)) if name == "Organization"
        ));
    }

    #[test]
    fn names_are_unique() {
        let mut registry = ClassRegistry::new();
        registry.register_entity(person()).expect("first");
        let err = registry
            .register_vocabulary(Vocabulary::new("Person"))
            .expect_err("duplicate");
        assert!(matches!(err, Error::DuplicateClass(name) if name == "Person"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn links_must_resolve() {
        let mut registry = ClassRegistry::new();
        registry
            .register_entity(person().with_field(FieldSpec::link(
                "affiliation",
                "affiliation",
                "Organization",
            )))
            .expect("forward reference allowed at registration");
        assert!(matches!(
            registry.check_links(),
            Err(Error::UnknownClass(name)) if name == "Organization"
        ));
    }
}
