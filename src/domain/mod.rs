//! Core domain models for depshield
//!
//! This module contains the fundamental types used throughout the
//! application:
//! - Update candidates and bump classification
//! - Package records flowing through the pipeline stages
//! - Workflow outcomes and statistics

mod outcome;
mod selection;
mod update;

pub use outcome::{ExitReason, WorkflowResult, WorkflowStats, EXIT_CODE_CANCELLED};
pub use selection::{InstallablePackage, PackageSelection, PackageSpec};
pub use update::{
    classify_bump, clean_version, is_stable_version, GroupedUpdates, PackageUpdate,
    VersionBumpType,
};
