//! Workflow outcome types: exit reasons, run statistics, final result

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit code reserved for user-initiated cancellation (POSIX SIGINT)
pub const EXIT_CODE_CANCELLED: u8 = 130;

/// Why a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    UserCancelled,
    NoUpdatesAvailable,
    AllUpdatesFiltered,
    NoPackagesSelected,
    NoPackagesConfirmed,
    Completed,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::UserCancelled => "user_cancelled",
            ExitReason::NoUpdatesAvailable => "no_updates_available",
            ExitReason::AllUpdatesFiltered => "all_updates_filtered",
            ExitReason::NoPackagesSelected => "no_packages_selected",
            ExitReason::NoPackagesConfirmed => "no_packages_confirmed",
            ExitReason::Completed => "completed",
        }
    }

    /// Human-facing note printed when the run ends
    pub fn message(&self) -> &'static str {
        match self {
            ExitReason::UserCancelled => "Cancelled. No changes were made.",
            ExitReason::NoUpdatesAvailable => "All dependencies are up to date.",
            ExitReason::AllUpdatesFiltered => {
                "All available updates are newer than the safety buffer allows."
            }
            ExitReason::NoPackagesSelected => "No packages selected. Nothing to do.",
            ExitReason::NoPackagesConfirmed => "No packages confirmed. Nothing was installed.",
            ExitReason::Completed => "Done.",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters accumulated while a pipeline runs
///
/// Owned by the run and mutated in place by the stage that is currently
/// executing; read-only once the result is produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStats {
    pub packages_found: usize,
    pub packages_after_filter: usize,
    pub packages_selected: usize,
    pub packages_installed: usize,
    pub packages_skipped: usize,
    pub duration_ms: u64,
}

impl WorkflowStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Final outcome of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub exit_code: u8,
    pub reason: ExitReason,
    pub stats: WorkflowStats,
    /// Soft quality-gate failures, reported but not fatal
    pub warnings: Vec<String>,
}

impl WorkflowResult {
    /// Map an exit reason onto the final result.
    ///
    /// Completed succeeds with exit 0; cancellation exits 130; the benign
    /// early exits report `success: false` but exit 0, since nothing failed
    /// and nothing was installed.
    pub fn from_reason(reason: ExitReason, stats: WorkflowStats, warnings: Vec<String>) -> Self {
        let (success, exit_code) = match reason {
            ExitReason::Completed => (true, 0),
            ExitReason::UserCancelled => (false, EXIT_CODE_CANCELLED),
            _ => (false, 0),
        };

        Self {
            success,
            exit_code,
            reason,
            stats,
            warnings,
        }
    }
}
