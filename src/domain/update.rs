//! Candidate updates and bump classification
//!
//! Version strings coming from the manifest may carry a `^` or `~` range
//! prefix. The prefix is stripped for numeric comparison but kept in the
//! original string for display.

use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A "newer version available" candidate for a declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUpdate {
    pub name: String,
    /// Declared version, possibly with a `^`/`~` prefix
    pub current_version: String,
    pub new_version: String,
}

impl PackageUpdate {
    pub fn new(
        name: impl Into<String>,
        current_version: impl Into<String>,
        new_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            current_version: current_version.into(),
            new_version: new_version.into(),
        }
    }

    /// The bump magnitude of this candidate
    pub fn bump_type(&self) -> VersionBumpType {
        classify_bump(&self.current_version, &self.new_version)
    }
}

impl fmt::Display for PackageUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} → {}",
            self.name, self.current_version, self.new_version
        )
    }
}

/// Which numeric component of the version increased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionBumpType {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for VersionBumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionBumpType::Major => write!(f, "major"),
            VersionBumpType::Minor => write!(f, "minor"),
            VersionBumpType::Patch => write!(f, "patch"),
        }
    }
}

/// Strip a single leading `^` or `~` range prefix
pub fn clean_version(version: &str) -> &str {
    version
        .strip_prefix('^')
        .or_else(|| version.strip_prefix('~'))
        .unwrap_or(version)
}

fn stable_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("valid regex"))
}

/// True iff the string is exactly three dot-separated non-negative integers,
/// with no prerelease or build suffix
pub fn is_stable_version(version: &str) -> bool {
    stable_version_re().is_match(version)
}

/// Parse a cleaned version string, rejecting anything that is not strict
/// `major.minor.patch`
fn parse_stable(version: &str) -> Option<Version> {
    if !is_stable_version(version) {
        return None;
    }
    Version::parse(version).ok()
}

/// Classify a version change by its highest differing numeric component.
///
/// Unparsable versions, identical numbers and downgrades all land in Patch.
pub fn classify_bump(current: &str, new: &str) -> VersionBumpType {
    let (Some(cur), Some(new)) = (
        parse_stable(clean_version(current)),
        parse_stable(clean_version(new)),
    ) else {
        return VersionBumpType::Patch;
    };

    if new.major > cur.major {
        VersionBumpType::Major
    } else if new.major == cur.major && new.minor > cur.minor {
        VersionBumpType::Minor
    } else {
        VersionBumpType::Patch
    }
}

/// Candidates partitioned by bump magnitude
///
/// Per-bucket order is discovery order; iteration across buckets is always
/// patch, then minor, then major.
#[derive(Debug, Clone, Default)]
pub struct GroupedUpdates {
    pub patch: Vec<PackageUpdate>,
    pub minor: Vec<PackageUpdate>,
    pub major: Vec<PackageUpdate>,
}

impl GroupedUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition candidates into the three buckets
    pub fn from_updates(updates: impl IntoIterator<Item = PackageUpdate>) -> Self {
        let mut grouped = Self::new();
        for update in updates {
            grouped.push(update);
        }
        grouped
    }

    pub fn push(&mut self, update: PackageUpdate) {
        match update.bump_type() {
            VersionBumpType::Patch => self.patch.push(update),
            VersionBumpType::Minor => self.minor.push(update),
            VersionBumpType::Major => self.major.push(update),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patch.is_empty() && self.minor.is_empty() && self.major.is_empty()
    }

    pub fn total(&self) -> usize {
        self.patch.len() + self.minor.len() + self.major.len()
    }

    /// All candidates in ascending-risk order
    pub fn iter_ordered(&self) -> impl Iterator<Item = (VersionBumpType, &PackageUpdate)> {
        self.patch
            .iter()
            .map(|u| (VersionBumpType::Patch, u))
            .chain(self.minor.iter().map(|u| (VersionBumpType::Minor, u)))
            .chain(self.major.iter().map(|u| (VersionBumpType::Major, u)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_version_caret() {
        assert_eq!(clean_version("^1.2.3"), "1.2.3");
    }

    #[test]
    fn test_clean_version_tilde() {
        assert_eq!(clean_version("~1.2.3"), "1.2.3");
    }

    #[test]
    fn test_clean_version_bare() {
        assert_eq!(clean_version("1.2.3"), "1.2.3");
    }

    #[test]
    fn test_clean_version_idempotent() {
        for v in ["^1.2.3", "~1.2.3", "1.2.3"] {
            let once = clean_version(v);
            assert_eq!(clean_version(once), once);
        }
    }

    #[test]
    fn test_is_stable_version() {
        assert!(is_stable_version("1.2.3"));
        assert!(is_stable_version("0.0.0"));
        assert!(is_stable_version("10.20.30"));
        assert!(!is_stable_version("1.2"));
        assert!(!is_stable_version("1.2.3.4"));
        assert!(!is_stable_version("1.2.3-beta.1"));
        assert!(!is_stable_version("1.2.3+build"));
        assert!(!is_stable_version("v1.2.3"));
        assert!(!is_stable_version("^1.2.3"));
        assert!(!is_stable_version(""));
    }

    #[test]
    fn test_classify_major() {
        assert_eq!(classify_bump("1.2.3", "2.0.0"), VersionBumpType::Major);
        assert_eq!(classify_bump("^1.2.3", "2.0.0"), VersionBumpType::Major);
        // Major takes precedence even when minor/patch decrease
        assert_eq!(classify_bump("1.9.9", "2.0.0"), VersionBumpType::Major);
    }

    #[test]
    fn test_classify_minor() {
        assert_eq!(classify_bump("1.2.3", "1.3.0"), VersionBumpType::Minor);
        assert_eq!(classify_bump("~1.2.9", "1.3.0"), VersionBumpType::Minor);
    }

    #[test]
    fn test_classify_patch() {
        assert_eq!(classify_bump("1.2.3", "1.2.4"), VersionBumpType::Patch);
    }

    #[test]
    fn test_classify_no_change_is_patch() {
        assert_eq!(classify_bump("1.2.3", "1.2.3"), VersionBumpType::Patch);
        assert_eq!(classify_bump("^1.2.3", "1.2.3"), VersionBumpType::Patch);
    }

    #[test]
    fn test_classify_downgrade_is_patch() {
        assert_eq!(classify_bump("2.0.0", "1.9.9"), VersionBumpType::Patch);
        assert_eq!(classify_bump("3.1.0", "2.5.0"), VersionBumpType::Patch);
        assert_eq!(classify_bump("1.3.0", "1.2.9"), VersionBumpType::Patch);
    }

    #[test]
    fn test_classify_unparsable_is_patch() {
        assert_eq!(classify_bump("not-a-version", "2.0.0"), VersionBumpType::Patch);
        assert_eq!(classify_bump("1.2.3", "2.0.0-beta.1"), VersionBumpType::Patch);
        assert_eq!(classify_bump("1.2", "1.3"), VersionBumpType::Patch);
    }

    #[test]
    fn test_package_update_display_keeps_prefix() {
        let update = PackageUpdate::new("lodash", "^4.17.21", "4.18.0");
        assert_eq!(format!("{}", update), "lodash: ^4.17.21 → 4.18.0");
    }

    #[test]
    fn test_grouped_updates_partition() {
        let grouped = GroupedUpdates::from_updates(vec![
            PackageUpdate::new("a", "1.0.0", "2.0.0"),
            PackageUpdate::new("b", "1.0.0", "1.1.0"),
            PackageUpdate::new("c", "1.0.0", "1.0.1"),
            PackageUpdate::new("d", "3.1.0", "3.2.0"),
        ]);

        assert_eq!(grouped.major.len(), 1);
        assert_eq!(grouped.minor.len(), 2);
        assert_eq!(grouped.patch.len(), 1);
        assert_eq!(grouped.total(), 4);
        assert!(!grouped.is_empty());
    }

    #[test]
    fn test_grouped_updates_bucket_keeps_discovery_order() {
        let grouped = GroupedUpdates::from_updates(vec![
            PackageUpdate::new("zeta", "1.0.0", "1.1.0"),
            PackageUpdate::new("alpha", "1.0.0", "1.1.0"),
        ]);
        assert_eq!(grouped.minor[0].name, "zeta");
        assert_eq!(grouped.minor[1].name, "alpha");
    }

    #[test]
    fn test_grouped_updates_iter_ordered_ascending_risk() {
        let grouped = GroupedUpdates::from_updates(vec![
            PackageUpdate::new("big", "1.0.0", "2.0.0"),
            PackageUpdate::new("mid", "1.0.0", "1.1.0"),
            PackageUpdate::new("small", "1.0.0", "1.0.1"),
        ]);

        let order: Vec<&str> = grouped
            .iter_ordered()
            .map(|(_, u)| u.name.as_str())
            .collect();
        assert_eq!(order, vec!["small", "mid", "big"]);
    }

    #[test]
    fn test_grouped_updates_empty() {
        let grouped = GroupedUpdates::new();
        assert!(grouped.is_empty());
        assert_eq!(grouped.total(), 0);
        assert_eq!(grouped.iter_ordered().count(), 0);
    }

    #[test]
    fn test_serde_bump_type() {
        let json = serde_json::to_string(&VersionBumpType::Minor).unwrap();
        assert_eq!(json, "\"minor\"");
        let parsed: VersionBumpType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, VersionBumpType::Minor);
    }
}
