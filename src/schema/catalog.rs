use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::EntityClass;
use crate::{ontology::Vocabulary, registry::ClassRegistry, Error, Result};

/// YAML declaration of the classes an application works with.
///
/// ```yaml
/// entities:
///   - name: Morphology
///     path: neuralactivity/simulation/morphology/v0.1.1
///     types: ["prov:Entity", "nsg:Morphology"]
///     fields:
///       - name: name
///         required: true
///       - name: distribution
///         link: Distribution
/// vocabularies:
///   - name: Species
///     terms:
///       Mus musculus: http://purl.obolibrary.org/obo/NCBITaxon_10090
/// embedded:
///   - Distribution
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub entities: Vec<EntityClass>,
    #[serde(default)]
    pub vocabularies: Vec<Vocabulary>,
    #[serde(default)]
    pub embedded: Vec<String>,
}

impl Catalog {
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    /// Registers every declared class.
    pub fn register_into(self, registry: &mut ClassRegistry) -> Result<()> {
        for vocabulary in self.vocabularies {
            registry.register_vocabulary(vocabulary)?;
        }
        for name in self.embedded {
            registry.register_embedded(name)?;
        }
        for class in self.entities {
            registry.register_entity(class)?;
        }
        Ok(())
    }

    /// Builds a registry holding exactly this catalog, with links checked.
    pub fn into_registry(self) -> Result<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        self.register_into(&mut registry)?;
        registry.check_links()?;
        Ok(registry)
    }
}
