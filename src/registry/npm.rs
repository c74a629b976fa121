//! npm registry metadata source
//!
//! Fetches package metadata from the npm registry.
//! API endpoint: https://registry.npmjs.org/{url-encoded package}

use crate::error::RegistryError;
use crate::registry::{HttpClient, MetadataSource, PackageMetadata};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// npm registry base URL
const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Metadata source backed by the public npm registry
pub struct NpmMetadataSource {
    client: HttpClient,
    base_url: String,
}

/// npm package metadata document
///
/// Both fields are required: a document missing either is a terminal parse
/// error, not something to retry.
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    versions: HashMap<String, serde_json::Value>,
    time: HashMap<String, DateTime<Utc>>,
}

impl NpmMetadataSource {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: NPM_REGISTRY_URL.to_string(),
        }
    }

    /// Point the source at a different registry endpoint (for tests)
    pub fn with_base_url(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn build_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, encode_package_name(package))
    }
}

/// URL-encode a package name; scoped names have their slash escaped
fn encode_package_name(package: &str) -> String {
    package.replace('/', "%2F")
}

#[async_trait]
impl MetadataSource for NpmMetadataSource {
    async fn fetch_metadata(&self, package: &str) -> Result<PackageMetadata, RegistryError> {
        let url = self.build_url(package);
        let response: NpmPackageResponse = self.client.get_json(&url, package).await?;

        Ok(PackageMetadata {
            versions: response.versions,
            time: response.time,
        })
    }
}
