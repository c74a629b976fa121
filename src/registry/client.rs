//! HTTP client shared foundation
//!
//! A thin reqwest wrapper with a fixed request timeout and error mapping
//! into the registry error taxonomy. Retry lives in the resolver, not here:
//! a single call maps to exactly one HTTP request.

use crate::error::RegistryError;
use reqwest::Client;
use std::time::Duration;

/// Fixed timeout for registry requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("depshield/", env!("CARGO_PKG_VERSION"));

/// Upper bound on concurrent registry calls. The resolver is sequential
/// today; the bound is the policy for future batched resolution.
pub const MAX_CONCURRENT_REQUESTS: usize = 10;

/// HTTP client wrapper for registry access
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with the default timeout and User-Agent
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Create a client with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                RegistryError::network("", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// GET a URL and deserialize the JSON body.
    ///
    /// Error mapping: 404 is PackageNotFound, other non-2xx is HttpStatus,
    /// timeout is Timeout, transport failure is Network, and a body that
    /// does not match `T` is InvalidResponse.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
    ) -> Result<T, RegistryError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::timeout(package)
            } else {
                RegistryError::network(package, e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::package_not_found(package));
        }
        if !status.is_success() {
            return Err(RegistryError::HttpStatus {
                package: package.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::timeout(package)
            } else {
                RegistryError::invalid_response(package, format!("failed to parse JSON: {}", e))
            }
        })
    }
}
