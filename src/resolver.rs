//! Age-safe version resolution against the registry
//!
//! The resolver owns the retry loop around the metadata fetch and the two
//! resolution operations:
//!
//! - `resolve_latest_safe_version`: among stable versions published on or
//!   before the cutoff, pick the one with the most recent publish
//!   timestamp. This is "most recently safe", not "numerically highest":
//!   a newer release still inside the safety buffer is skipped in favor of
//!   the latest release that already cleared it.
//! - `validate_version`: check one exact version's publish date.
//!
//! "No version is old enough" is a normal result, not an error; callers
//! branch on `too_new`.

use crate::context::ExecutionContext;
use crate::domain::is_stable_version;
use crate::error::RegistryError;
use crate::registry::{MetadataSource, PackageMetadata, MAX_CONCURRENT_REQUESTS};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Total fetch attempts, including the first
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts
const BASE_BACKOFF_MS: u64 = 1000;

/// Outcome of resolving or validating a version
///
/// `version: None` with `too_new: true` means no version satisfies the
/// safety buffer. `age_in_days` is measured against wall-clock now, not the
/// cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionResolution {
    pub version: Option<String>,
    pub too_new: bool,
    pub age_in_days: Option<i64>,
}

/// Resolves age-safe versions for packages against a metadata source
pub struct VersionResolver {
    source: Arc<dyn MetadataSource>,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
    semaphore: Arc<Semaphore>,
}

impl VersionResolver {
    /// Create a resolver bound to the run's cutoff
    pub fn new(source: Arc<dyn MetadataSource>, context: &ExecutionContext) -> Self {
        Self::with_clock(source, context.cutoff, Utc::now())
    }

    /// Create a resolver with explicit cutoff and clock (for tests)
    pub fn with_clock(
        source: Arc<dyn MetadataSource>,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            cutoff,
            now,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        }
    }

    /// Resolve the most recently published stable version whose publish
    /// date is on or before the cutoff
    pub async fn resolve_latest_safe_version(
        &self,
        package: &str,
    ) -> Result<VersionResolution, RegistryError> {
        let metadata = self.fetch_with_retry(package).await?;

        let eligible = metadata
            .versions
            .keys()
            .filter(|v| is_stable_version(v))
            .filter_map(|v| metadata.publish_date(v).map(|date| (v, date)))
            .filter(|(_, date)| *date <= self.cutoff)
            .max_by_key(|(_, date)| *date);

        Ok(match eligible {
            Some((version, date)) => VersionResolution {
                version: Some(version.clone()),
                too_new: false,
                age_in_days: Some((self.now - date).num_days()),
            },
            None => VersionResolution {
                version: None,
                too_new: true,
                age_in_days: None,
            },
        })
    }

    /// Validate one exact version against the safety buffer.
    ///
    /// A version absent from the registry is a hard error, distinct from a
    /// too-new result.
    pub async fn validate_version(
        &self,
        package: &str,
        version: &str,
    ) -> Result<VersionResolution, RegistryError> {
        let metadata = self.fetch_with_retry(package).await?;

        let Some(date) = metadata.publish_date(version) else {
            return Err(RegistryError::version_not_found(package, version));
        };

        Ok(VersionResolution {
            version: Some(version.to_string()),
            too_new: date > self.cutoff,
            age_in_days: Some((self.now - date).num_days()),
        })
    }

    /// Fetch metadata with up to MAX_ATTEMPTS attempts.
    ///
    /// Terminal errors (not found, malformed response) surface immediately.
    /// Transient errors back off 2^(attempt-1) seconds between attempts;
    /// exhausting the budget wraps the last error as FetchFailed.
    async fn fetch_with_retry(&self, package: &str) -> Result<PackageMetadata, RegistryError> {
        let _permit = self.semaphore.acquire().await.unwrap();

        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.source.fetch_metadata(package).await {
                Ok(metadata) => return Ok(metadata),
                Err(e) if e.is_retryable() => {
                    if attempt < MAX_ATTEMPTS {
                        let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let last = last_error.unwrap_or_else(|| {
            RegistryError::network(package, "unknown error".to_string())
        });
        Err(RegistryError::FetchFailed {
            package: package.to_string(),
            status: last.status(),
            message: last.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type FetchFn =
        Box<dyn Fn(usize) -> Result<PackageMetadata, RegistryError> + Send + Sync>;

    /// Metadata source driven by a closure over the attempt index
    struct ScriptedSource {
        fetch: FetchFn,
        attempts: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(
            fetch: impl Fn(usize) -> Result<PackageMetadata, RegistryError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                fetch: Box::new(fetch),
                attempts: AtomicUsize::new(0),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataSource for ScriptedSource {
        async fn fetch_metadata(&self, _package: &str) -> Result<PackageMetadata, RegistryError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            (self.fetch)(attempt)
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        fixed_now() - chrono::Duration::days(days)
    }

    fn metadata(entries: &[(&str, DateTime<Utc>)]) -> PackageMetadata {
        let mut versions = HashMap::new();
        let mut time = HashMap::new();
        for (version, date) in entries {
            versions.insert(version.to_string(), serde_json::Value::Null);
            time.insert(version.to_string(), *date);
        }
        PackageMetadata { versions, time }
    }

    fn resolver(source: Arc<ScriptedSource>, cutoff_days_ago: i64) -> VersionResolver {
        VersionResolver::with_clock(source, days_ago(cutoff_days_ago), fixed_now())
    }

    #[tokio::test]
    async fn test_resolve_picks_latest_publish_among_eligible() {
        // Cutoff 7 days ago. 2.0.0 is newest by number but published 3 days
        // ago; 1.5.0 is the most recently published eligible version even
        // though 1.9.0 has a higher number.
        let source = ScriptedSource::new(|_| {
            Ok(metadata(&[
                ("1.9.0", days_ago(30)),
                ("1.5.0", days_ago(10)),
                ("2.0.0", days_ago(3)),
            ]))
        });
        let resolver = resolver(source, 7);

        let resolution = resolver.resolve_latest_safe_version("pkg").await.unwrap();
        assert_eq!(resolution.version, Some("1.5.0".to_string()));
        assert!(!resolution.too_new);
        assert_eq!(resolution.age_in_days, Some(10));
    }

    #[tokio::test]
    async fn test_resolve_publish_order_beats_numeric_order() {
        // Two eligible versions with timestamps T1 < T2 < T3; the T3 one
        // wins even though its number is lower.
        let source = ScriptedSource::new(|_| {
            Ok(metadata(&[
                ("3.0.0", days_ago(40)),
                ("3.1.0", days_ago(30)),
                ("2.9.9", days_ago(20)),
            ]))
        });
        let resolver = resolver(source, 7);

        let resolution = resolver.resolve_latest_safe_version("pkg").await.unwrap();
        assert_eq!(resolution.version, Some("2.9.9".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_all_too_new() {
        let source = ScriptedSource::new(|_| {
            Ok(metadata(&[
                ("1.0.0", days_ago(2)),
                ("1.1.0", days_ago(1)),
            ]))
        });
        let resolver = resolver(source, 7);

        let resolution = resolver.resolve_latest_safe_version("pkg").await.unwrap();
        assert_eq!(resolution.version, None);
        assert!(resolution.too_new);
        assert_eq!(resolution.age_in_days, None);
    }

    #[tokio::test]
    async fn test_resolve_ignores_prerelease_versions() {
        let source = ScriptedSource::new(|_| {
            Ok(metadata(&[
                ("1.0.0", days_ago(30)),
                ("2.0.0-beta.1", days_ago(10)),
                ("2.0.0-rc.1", days_ago(8)),
            ]))
        });
        let resolver = resolver(source, 7);

        let resolution = resolver.resolve_latest_safe_version("pkg").await.unwrap();
        assert_eq!(resolution.version, Some("1.0.0".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_version_exactly_at_cutoff_is_eligible() {
        let source = ScriptedSource::new(|_| Ok(metadata(&[("1.0.0", days_ago(7))])));
        let resolver = resolver(source, 7);

        let resolution = resolver.resolve_latest_safe_version("pkg").await.unwrap();
        assert_eq!(resolution.version, Some("1.0.0".to_string()));
        assert_eq!(resolution.age_in_days, Some(7));
    }

    #[tokio::test]
    async fn test_validate_version_too_new() {
        let source = ScriptedSource::new(|_| Ok(metadata(&[("1.0.0", days_ago(3))])));
        let resolver = resolver(source, 7);

        let resolution = resolver.validate_version("pkg", "1.0.0").await.unwrap();
        assert_eq!(resolution.version, Some("1.0.0".to_string()));
        assert!(resolution.too_new);
        assert_eq!(resolution.age_in_days, Some(3));
    }

    #[tokio::test]
    async fn test_validate_version_old_enough() {
        let source = ScriptedSource::new(|_| Ok(metadata(&[("1.0.0", days_ago(30))])));
        let resolver = resolver(source, 7);

        let resolution = resolver.validate_version("pkg", "1.0.0").await.unwrap();
        assert!(!resolution.too_new);
        assert_eq!(resolution.age_in_days, Some(30));
    }

    #[tokio::test]
    async fn test_validate_missing_version_is_hard_error() {
        let source = ScriptedSource::new(|_| Ok(metadata(&[("1.0.0", days_ago(30))])));
        let resolver = resolver(source, 7);

        let err = resolver.validate_version("pkg", "9.9.9").await.unwrap_err();
        assert!(matches!(err, RegistryError::VersionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_not_found_is_never_retried() {
        let source = ScriptedSource::new(|_| Err(RegistryError::package_not_found("pkg")));
        let resolver = resolver(source.clone(), 7);

        let err = resolver.resolve_latest_safe_version("pkg").await.unwrap_err();
        assert!(matches!(err, RegistryError::PackageNotFound { .. }));
        assert_eq!(source.attempts(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_never_retried() {
        let source =
            ScriptedSource::new(|_| Err(RegistryError::invalid_response("pkg", "missing time")));
        let resolver = resolver(source.clone(), 7);

        let err = resolver.resolve_latest_safe_version("pkg").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse { .. }));
        assert_eq!(source.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_retried_twice_then_wrapped() {
        let source = ScriptedSource::new(|_| Err(RegistryError::network("pkg", "refused")));
        let resolver = resolver(source.clone(), 7);

        let err = resolver.resolve_latest_safe_version("pkg").await.unwrap_err();
        assert!(matches!(err, RegistryError::FetchFailed { .. }));
        assert_eq!(source.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failed_carries_last_http_status() {
        let source = ScriptedSource::new(|_| {
            Err(RegistryError::HttpStatus {
                package: "pkg".to_string(),
                status: 503,
            })
        });
        let resolver = resolver(source, 7);

        let err = resolver.resolve_latest_safe_version("pkg").await.unwrap_err();
        match err {
            RegistryError::FetchFailed {
                package, status, ..
            } => {
                assert_eq!(package, "pkg");
                assert_eq!(status, Some(503));
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let source = ScriptedSource::new(|attempt| {
            if attempt < 2 {
                Err(RegistryError::timeout("pkg"))
            } else {
                Ok(metadata(&[("1.0.0", days_ago(30))]))
            }
        });
        let resolver = resolver(source.clone(), 7);

        let resolution = resolver.resolve_latest_safe_version("pkg").await.unwrap();
        assert_eq!(resolution.version, Some("1.0.0".to_string()));
        assert_eq!(source.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_are_one_then_two_seconds() {
        let source = ScriptedSource::new(|_| Err(RegistryError::network("pkg", "refused")));
        let resolver = resolver(source, 7);

        let started = tokio::time::Instant::now();
        let _ = resolver.resolve_latest_safe_version("pkg").await;
        // 1000ms before attempt 2 plus 2000ms before attempt 3
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }
}
