//! Registry metadata access
//!
//! This module provides:
//! - The MetadataSource trait the resolver talks to
//! - An HTTP client with a fixed request timeout
//! - The npm registry implementation

mod client;
mod npm;

pub use client::{HttpClient, MAX_CONCURRENT_REQUESTS};
pub use npm::NpmMetadataSource;

use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Raw version metadata for one package
///
/// Mirrors the registry document shape: a `versions` map keyed by version
/// string and a `time` map of publish timestamps. The `time` map also
/// carries non-version keys (`created`, `modified`); callers only ever look
/// up concrete version strings.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub versions: HashMap<String, serde_json::Value>,
    pub time: HashMap<String, DateTime<Utc>>,
}

impl PackageMetadata {
    /// Publish timestamp for an exact version, if the registry knows it
    pub fn publish_date(&self, version: &str) -> Option<DateTime<Utc>> {
        self.time.get(version).copied()
    }
}

/// A remote source of package version metadata
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch the full metadata document for a package.
    ///
    /// One attempt only; the resolver owns retries.
    async fn fetch_metadata(&self, package: &str) -> Result<PackageMetadata, RegistryError>;
}
