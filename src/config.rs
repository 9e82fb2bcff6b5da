//! Session settings.
//!
//! Every setting has a default, so an empty YAML document is a valid
//! configuration:
//!
//! ```yaml
//! page_size: 100
//! name_path: "schema:name"
//! name_context:
//!   schema: "http://schema.org/"
//! cascade_saves: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Number of resources returned by a list without an explicit size.
    pub page_size: usize,
    /// Filter path matched against an object's name by the exists check.
    pub name_path: String,
    /// JSON-LD context sent with the name filter.
    pub name_context: Value,
    /// Save referenced objects without an identifier before their referrer.
    pub cascade_saves: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            name_path: "schema:name".to_string(),
            name_context: json!({"schema": "http://schema.org/"}),
            cascade_saves: true,
        }
    }
}

impl SessionSettings {
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}
