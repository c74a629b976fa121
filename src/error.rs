//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: issues reading the project manifest
//! - RegistryError: registry communication, split into terminal and
//!   retryable kinds
//! - PromptError: interactive prompt failures, with an identity-matchable
//!   Aborted variant
//! - ToolError: failures launching external binaries
//! - WorkflowError: fatal pipeline failures

use std::path::PathBuf;
use thiserror::Error;

/// Errors related to the project manifest (package.json)
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read the manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the manifest file
    #[error("failed to parse JSON in {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

impl ManifestError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors related to registry communication
///
/// NotFound, VersionNotFound and InvalidResponse are terminal: retrying the
/// same request cannot succeed. Network, HttpStatus and Timeout are
/// transient and eligible for retry. FetchFailed wraps the last transient
/// error once the retry budget is exhausted.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package does not exist in the registry (HTTP 404)
    #[error("package '{package}' not found in the npm registry")]
    PackageNotFound { package: String },

    /// The requested exact version does not exist for the package
    #[error("version {version} of '{package}' does not exist in the registry")]
    VersionNotFound { package: String, version: String },

    /// Response body did not match the expected shape
    #[error("invalid registry response for '{package}': {message}")]
    InvalidResponse { package: String, message: String },

    /// Network-level request failure
    #[error("network error fetching '{package}': {message}")]
    Network { package: String, message: String },

    /// Non-2xx, non-404 HTTP status
    #[error("registry returned HTTP {status} for '{package}'")]
    HttpStatus { package: String, status: u16 },

    /// Request exceeded the fixed timeout
    #[error("timeout while fetching '{package}' from the registry")]
    Timeout { package: String },

    /// Retry budget exhausted; wraps the last transient error
    #[error("registry fetch failed for '{package}'{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    FetchFailed {
        package: String,
        status: Option<u16>,
        message: String,
    },
}

impl RegistryError {
    pub fn package_not_found(package: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
        }
    }

    pub fn version_not_found(package: impl Into<String>, version: impl Into<String>) -> Self {
        RegistryError::VersionNotFound {
            package: package.into(),
            version: version.into(),
        }
    }

    pub fn invalid_response(package: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            message: message.into(),
        }
    }

    pub fn network(package: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Network {
            package: package.into(),
            message: message.into(),
        }
    }

    pub fn timeout(package: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
        }
    }

    /// Whether another attempt at the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::Network { .. }
                | RegistryError::HttpStatus { .. }
                | RegistryError::Timeout { .. }
        )
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::HttpStatus { status, .. } => Some(*status),
            RegistryError::FetchFailed { status, .. } => *status,
            _ => None,
        }
    }
}

/// Errors raised by interactive prompts
///
/// Aborted is matched by identity in the pipeline to unify Ctrl-C during a
/// prompt with a signal between prompts.
#[derive(Error, Debug)]
pub enum PromptError {
    /// The user aborted the prompt (Ctrl-C / closed stdin)
    #[error("prompt aborted")]
    Aborted,

    /// Terminal I/O failure
    #[error("prompt I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors launching or reading external tools
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool binary could not be started
    #[error("failed to launch '{tool}': {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool produced output we could not parse
    #[error("unexpected output from '{tool}': {message}")]
    Malformed { tool: String, message: String },
}

impl ToolError {
    pub fn launch(tool: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Launch {
            tool: tool.into(),
            source,
        }
    }

    pub fn malformed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Malformed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Fatal pipeline failures
///
/// Soft conditions (empty selection, declined confirmations, too-new
/// versions) are not errors; they travel as exit reasons instead.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The installer subprocess returned non-zero
    #[error("installer exited with {}", code.map(|c| format!("status {}", c)).unwrap_or_else(|| "a signal".to_string()))]
    InstallFailed { code: Option<i32> },

    /// The dependency-tree reconciliation subprocess returned non-zero
    #[error("dependency reconciliation exited with {}", code.map(|c| format!("status {}", c)).unwrap_or_else(|| "a signal".to_string()))]
    ReconcileFailed { code: Option<i32> },
}
