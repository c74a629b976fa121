//! The add pipeline
//!
//! Adding a package is three stages: resolve a safe version, compare it
//! against what the manifest already declares, then confirm and install.
//! The same safety buffer applies whether the user pinned a version or
//! asked for the latest.

use std::path::PathBuf;
use std::time::Instant;

use colored::Colorize;

use super::{confirm_or_cancel, StepResult, WorkflowServices};
use crate::context::ExecutionContext;
use crate::domain::{
    clean_version, ExitReason, InstallablePackage, PackageSpec, WorkflowResult, WorkflowStats,
};
use crate::error::WorkflowError;
use crate::resolver::VersionResolver;
use crate::tools::InstallOptions;

pub struct AddWorkflow {
    context: ExecutionContext,
    resolver: VersionResolver,
    services: WorkflowServices,
    dir: PathBuf,
    quiet: bool,
}

impl AddWorkflow {
    pub fn new(
        context: ExecutionContext,
        resolver: VersionResolver,
        services: WorkflowServices,
        dir: PathBuf,
        quiet: bool,
    ) -> Self {
        Self {
            context,
            resolver,
            services,
            dir,
            quiet,
        }
    }

    pub async fn run(
        &self,
        spec: &PackageSpec,
        save_dev: bool,
    ) -> Result<WorkflowResult, WorkflowError> {
        let started = Instant::now();
        let mut stats = WorkflowStats {
            packages_found: 1,
            ..WorkflowStats::new()
        };

        let version = match self.resolve_version(spec).await? {
            StepResult::Continue(version) => version,
            StepResult::Exit(reason) => return Ok(finish(reason, stats, started)),
        };
        stats.packages_after_filter = 1;

        let package = match self.check_existing(spec, version, save_dev)? {
            StepResult::Continue(package) => package,
            StepResult::Exit(reason) => return Ok(finish(reason, stats, started)),
        };
        stats.packages_selected = 1;

        match self.confirm_and_install(&package, &mut stats)? {
            StepResult::Continue(()) => Ok(finish(ExitReason::Completed, stats, started)),
            StepResult::Exit(reason) => Ok(finish(reason, stats, started)),
        }
    }

    /// Stage 1: find a version old enough to install.
    ///
    /// An explicit version outside the buffer is rejected, never silently
    /// replaced by an older one; with no explicit version the newest
    /// stable release at or before the cutoff wins.
    async fn resolve_version(
        &self,
        spec: &PackageSpec,
    ) -> Result<StepResult<String>, WorkflowError> {
        match &spec.version {
            Some(requested) => {
                let version = clean_version(requested).to_string();
                let resolution = self.resolver.validate_version(&spec.name, &version).await?;
                if resolution.too_new {
                    if !self.quiet {
                        let age = resolution.age_in_days.unwrap_or(0);
                        println!(
                            "{}@{} is only {} day(s) old, inside the {}-day buffer",
                            spec.name, version, age, self.context.days
                        );
                    }
                    return Ok(StepResult::Exit(ExitReason::AllUpdatesFiltered));
                }
                Ok(StepResult::Continue(version))
            }
            None => {
                let resolution = self.resolver.resolve_latest_safe_version(&spec.name).await?;
                match resolution.version {
                    Some(version) => Ok(StepResult::Continue(version)),
                    None => {
                        if !self.quiet {
                            println!(
                                "No stable release of {} is older than {} day(s)",
                                spec.name, self.context.days
                            );
                        }
                        Ok(StepResult::Exit(ExitReason::AllUpdatesFiltered))
                    }
                }
            }
        }
    }

    /// Stage 2: nothing to do when the manifest already pins this version
    fn check_existing(
        &self,
        spec: &PackageSpec,
        version: String,
        save_dev: bool,
    ) -> Result<StepResult<InstallablePackage>, WorkflowError> {
        let package = InstallablePackage::new(&spec.name, version, save_dev);
        match self.context.all_dependencies.get(&spec.name) {
            Some(declared) if clean_version(declared) == package.version => {
                Ok(StepResult::Exit(ExitReason::NoUpdatesAvailable))
            }
            Some(declared) => Ok(StepResult::Continue(package.with_existing(declared.clone()))),
            None => Ok(StepResult::Continue(package)),
        }
    }

    /// Stage 3: security scan, one confirmation, one install
    fn confirm_and_install(
        &self,
        package: &InstallablePackage,
        stats: &mut WorkflowStats,
    ) -> Result<StepResult<()>, WorkflowError> {
        let spec = package.spec();
        let passed = self.services.scanner.scan(&spec, &self.dir)?;
        if !passed && !self.quiet {
            println!("  {} security scan flagged {}", "warn".yellow(), spec);
        }

        let question = match &package.existing {
            Some(existing) => format!(
                "Update {} from {} to {}?",
                package.name.bold(),
                existing,
                package.version
            ),
            None => format!("Add {}?", spec.bold()),
        };
        match confirm_or_cancel(self.services.gate.as_ref(), &question)? {
            StepResult::Continue(true) => {}
            StepResult::Continue(false) => {
                stats.packages_skipped = 1;
                return Ok(StepResult::Exit(ExitReason::NoPackagesConfirmed));
            }
            StepResult::Exit(reason) => return Ok(StepResult::Exit(reason)),
        }

        let options = InstallOptions {
            save_dev: package.save_dev,
            before: self.context.cutoff,
        };
        let status = self
            .services
            .installer
            .install(&[spec], &options, &self.dir)?;
        if !status.success {
            return Err(WorkflowError::InstallFailed { code: status.code });
        }

        stats.packages_installed = 1;
        Ok(StepResult::Continue(()))
    }
}

fn finish(reason: ExitReason, mut stats: WorkflowStats, started: Instant) -> WorkflowResult {
    stats.duration_ms = started.elapsed().as_millis() as u64;
    WorkflowResult::from_reason(reason, stats, Vec::new())
}
