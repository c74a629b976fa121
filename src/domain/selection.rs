//! Package records flowing through the pipeline stages
//!
//! A raw `PackageSpec` (what the user typed) narrows into a
//! `PackageSelection` (what the user picked) and finally an
//! `InstallablePackage` (what the installer receives). Values are rewrapped
//! between stages, never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A package name plus optional version, as given by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpec {
    /// Parse `name` or `name@version`, handling scoped names like
    /// `@types/node@20.1.0`
    pub fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err("empty package spec".to_string());
        }

        // A leading '@' starts a scope, not a version separator, so the
        // search skips the first character (which may be multi-byte)
        let first_len = spec.chars().next().map(char::len_utf8).unwrap_or(0);
        let at = spec[first_len..].rfind('@').map(|i| i + first_len);

        let (name, version) = match at {
            Some(i) => {
                let (name, rest) = spec.split_at(i);
                (name, Some(rest[1..].to_string()))
            }
            None => (spec, None),
        };

        if name.is_empty() {
            return Err(format!("invalid package spec: {}", spec));
        }
        if let Some(ref v) = version {
            if v.is_empty() {
                return Err(format!("empty version in package spec: {}", spec));
            }
        }

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The atomic unit threaded through selection, security, install and
/// reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSelection {
    pub name: String,
    /// Concrete version, no range operators
    pub version: String,
}

impl PackageSelection {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `name@version` form passed to external tools
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for PackageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec())
    }
}

/// A fully resolved package ready for the add-flow install stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallablePackage {
    pub name: String,
    pub version: String,
    /// Install into devDependencies
    pub save_dev: bool,
    /// Version currently declared in the manifest, if any
    pub existing: Option<String>,
}

impl InstallablePackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>, save_dev: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            save_dev,
            existing: None,
        }
    }

    pub fn with_existing(mut self, existing: impl Into<String>) -> Self {
        self.existing = Some(existing.into());
        self
    }

    /// `name@version` form passed to external tools
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// The selection this package corresponds to
    pub fn selection(&self) -> PackageSelection {
        PackageSelection::new(&self.name, &self.version)
    }
}
