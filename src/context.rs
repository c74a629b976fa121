//! Execution context for a single invocation
//!
//! The context is built once at process start and is read-only afterwards.
//! In particular the safety-buffer cutoff is computed at construction, so
//! every age comparison in a run uses the same instant even when the
//! interactive session takes a long time.

use crate::manifest::Manifest;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Default safety buffer in days
pub const DEFAULT_SAFETY_DAYS: u32 = 7;

/// Names of the project scripts the quality gates run
#[derive(Debug, Clone)]
pub struct ScriptNames {
    pub lint: String,
    pub typecheck: String,
    pub test: String,
    pub build: String,
}

impl Default for ScriptNames {
    fn default() -> Self {
        Self {
            lint: "lint".to_string(),
            typecheck: "typecheck".to_string(),
            test: "test".to_string(),
            build: "build".to_string(),
        }
    }
}

/// Read-only snapshot of the project plus the computed cutoff
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Declared npm scripts
    pub scripts: BTreeMap<String, String>,
    /// Production dependencies as declared
    pub dependencies: BTreeMap<String, String>,
    /// Development dependencies as declared
    pub dev_dependencies: BTreeMap<String, String>,
    /// Merge of the two; devDependencies win on name collision
    pub all_dependencies: BTreeMap<String, String>,
    /// Publish-date cutoff: now minus the safety buffer
    pub cutoff: DateTime<Utc>,
    /// Safety buffer length in days
    pub days: u32,
    /// Configured quality-gate script names
    pub script_names: ScriptNames,
}

impl ExecutionContext {
    /// Build a context from a loaded manifest
    pub fn new(manifest: &Manifest, days: u32, script_names: ScriptNames) -> Self {
        Self::with_now(manifest, days, script_names, Utc::now())
    }

    /// Build a context against a fixed clock (for tests)
    pub fn with_now(
        manifest: &Manifest,
        days: u32,
        script_names: ScriptNames,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            scripts: manifest.scripts.clone(),
            dependencies: manifest.dependencies.clone(),
            dev_dependencies: manifest.dev_dependencies.clone(),
            all_dependencies: manifest.all_dependencies(),
            cutoff: now - Duration::days(i64::from(days)),
            days,
            script_names,
        }
    }

    /// Whether the named script exists in the manifest
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}
