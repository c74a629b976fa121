//! package.json reading
//!
//! The manifest is read exactly once per invocation, at context
//! construction. depshield never writes it back; all manifest mutation is a
//! side effect of the external installer.

use crate::error::ManifestError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Snapshot of the fields of package.json the workflow cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// Declared npm scripts
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    /// Production dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Read and parse `package.json` from the given project directory
    pub fn load(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join("package.json");
        if !path.exists() {
            return Err(ManifestError::not_found(path));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ManifestError::read_error(path.clone(), e))?;

        Self::parse(&content).map_err(|e| match e {
            ManifestError::ParseError { message, .. } => ManifestError::parse_error(path, message),
            other => other,
        })
    }

    /// Parse manifest content
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(content)
            .map_err(|e| ManifestError::parse_error("package.json", e.to_string()))
    }

    /// Merge of dependencies and devDependencies; dev wins on name collision
    pub fn all_dependencies(&self) -> BTreeMap<String, String> {
        let mut all = self.dependencies.clone();
        for (name, version) in &self.dev_dependencies {
            all.insert(name.clone(), version.clone());
        }
        all
    }

    /// Declared version for a package, if any (dev wins on collision)
    pub fn declared_version(&self, name: &str) -> Option<&str> {
        self.dev_dependencies
            .get(name)
            .or_else(|| self.dependencies.get(name))
            .map(String::as_str)
    }
}
