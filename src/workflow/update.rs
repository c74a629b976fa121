//! The interactive update pipeline
//!
//! Nine stages run in a fixed order: discover, filter by publish age,
//! group by bump size, select, security-review, install, reconcile,
//! quality gates, build verification. The first five can end the run
//! early with a benign reason; from installation onward the run either
//! completes or fails hard.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use colored::Colorize;

use super::{confirm_or_cancel, StepResult, WorkflowServices};
use crate::context::ExecutionContext;
use crate::domain::{
    clean_version, ExitReason, GroupedUpdates, PackageSelection, PackageUpdate, WorkflowResult,
    WorkflowStats,
};
use crate::error::{PromptError, WorkflowError};
use crate::progress::Progress;
use crate::resolver::VersionResolver;
use crate::tools::InstallOptions;

pub struct UpdateWorkflow {
    context: ExecutionContext,
    resolver: VersionResolver,
    services: WorkflowServices,
    dir: PathBuf,
    quiet: bool,
}

impl UpdateWorkflow {
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

    pub async fn run(&self) -> Result<WorkflowResult, WorkflowError> {
        let started = Instant::now();
        let mut stats = WorkflowStats::new();
        let mut warnings = Vec::new();

        let updates = match self.discover(&mut stats)? {
            StepResult::Continue(updates) => updates,
            StepResult::Exit(reason) => return Ok(finish(reason, stats, warnings, started)),
        };

        let eligible = match self.apply_safety_buffer(updates, &mut stats).await? {
            StepResult::Continue(eligible) => eligible,
            StepResult::Exit(reason) => return Ok(finish(reason, stats, warnings, started)),
        };

        let grouped = GroupedUpdates::from_updates(eligible);

        let selections = match self.select(&grouped, &mut stats)? {
            StepResult::Continue(selections) => selections,
            StepResult::Exit(reason) => return Ok(finish(reason, stats, warnings, started)),
        };

        let confirmed = match self.review_and_confirm(selections, &mut stats)? {
            StepResult::Continue(confirmed) => confirmed,
            StepResult::Exit(reason) => return Ok(finish(reason, stats, warnings, started)),
        };

        self.install(&confirmed, &mut stats)?;
        self.reconcile()?;

        for (label, name) in self.quality_gates() {
            if let StepResult::Exit(reason) = self.run_gate(label, &name, &mut warnings)? {
                return Ok(finish(reason, stats, warnings, started));
            }
        }

        Ok(finish(ExitReason::Completed, stats, warnings, started))
    }

    /// Stage 1: ask the update checker what is outdated
    fn discover(
        &self,
        stats: &mut WorkflowStats,
    ) -> Result<StepResult<Vec<PackageUpdate>>, WorkflowError> {
        let mut progress = Progress::new(!self.quiet);
        progress.spinner("Checking for updates...");
        let upgraded = self.services.checker.check_updates(&self.dir)?;
        progress.finish_and_clear();
        let updates = candidates_from(&upgraded, &self.context);
        stats.packages_found = updates.len();

        if updates.is_empty() {
            return Ok(StepResult::Exit(ExitReason::NoUpdatesAvailable));
        }

        if !self.quiet {
            println!("Found {} outdated package(s)", updates.len());
        }
        Ok(StepResult::Continue(updates))
    }

    /// Stage 2: drop every update published inside the safety buffer.
    ///
    /// A registry failure here, after the resolver's own retries, aborts
    /// the run rather than silently letting an unvetted version through.
    async fn apply_safety_buffer(
        &self,
        updates: Vec<PackageUpdate>,
        stats: &mut WorkflowStats,
    ) -> Result<StepResult<Vec<PackageUpdate>>, WorkflowError> {
        let mut progress = Progress::new(!self.quiet);
        progress.start(updates.len() as u64, "Checking publish dates");

        let mut eligible = Vec::new();
        for update in updates {
            progress.set_message(&update.name);
            let resolution = self
                .resolver
                .validate_version(&update.name, &update.new_version)
                .await?;
            progress.inc();

            if resolution.too_new {
                stats.packages_skipped += 1;
                if !self.quiet {
                    let age = resolution.age_in_days.unwrap_or(0);
                    println!(
                        "  {} {} is only {} day(s) old, inside the {}-day buffer",
                        "skip".yellow(),
                        update,
                        age,
                        self.context.days
                    );
                }
            } else {
                eligible.push(update);
            }
        }
        progress.finish_and_clear();

        stats.packages_after_filter = eligible.len();
        if eligible.is_empty() {
            return Ok(StepResult::Exit(ExitReason::AllUpdatesFiltered));
        }
        Ok(StepResult::Continue(eligible))
    }

    /// Stage 4: interactive selection over the grouped candidates
    fn select(
        &self,
        grouped: &GroupedUpdates,
        stats: &mut WorkflowStats,
    ) -> Result<StepResult<Vec<PackageSelection>>, WorkflowError> {
        let selections = match self.services.gate.select_updates(grouped) {
            Ok(selections) => selections,
            Err(PromptError::Aborted) => {
                return Ok(StepResult::Exit(ExitReason::UserCancelled));
            }
            Err(e) => return Err(e.into()),
        };

        stats.packages_selected = selections.len();
        if selections.is_empty() {
            return Ok(StepResult::Exit(ExitReason::NoPackagesSelected));
        }
        Ok(StepResult::Continue(selections))
    }

    /// Stage 5: scan each selected package, then ask per package.
    ///
    /// A failed scan does not block installation on its own; the user sees
    /// the verdict and decides. Declining one package skips only that
    /// package.
    fn review_and_confirm(
        &self,
        selections: Vec<PackageSelection>,
        stats: &mut WorkflowStats,
    ) -> Result<StepResult<Vec<PackageSelection>>, WorkflowError> {
        let mut confirmed = Vec::new();
        for selection in selections {
            let spec = selection.spec();
            let passed = self.services.scanner.scan(&spec, &self.dir)?;
            if !passed && !self.quiet {
                println!("  {} security scan flagged {}", "warn".yellow(), spec);
            }

            match confirm_or_cancel(
                self.services.gate.as_ref(),
                &format!("Install {}?", spec.bold()),
            )? {
                StepResult::Continue(true) => confirmed.push(selection),
                StepResult::Continue(false) => stats.packages_skipped += 1,
                StepResult::Exit(reason) => return Ok(StepResult::Exit(reason)),
            }
        }

        if confirmed.is_empty() {
            return Ok(StepResult::Exit(ExitReason::NoPackagesConfirmed));
        }
        Ok(StepResult::Continue(confirmed))
    }

    /// Stage 6: one batched install for every confirmed package
    fn install(
        &self,
        confirmed: &[PackageSelection],
        stats: &mut WorkflowStats,
    ) -> Result<(), WorkflowError> {
        let specs: Vec<String> = confirmed.iter().map(PackageSelection::spec).collect();
        if !self.quiet {
            println!("{}", format!("Installing {} package(s)...", specs.len()).bold());
        }

        let options = InstallOptions {
            save_dev: false,
            before: self.context.cutoff,
        };
        let status = self.services.installer.install(&specs, &options, &self.dir)?;
        if !status.success {
            return Err(WorkflowError::InstallFailed { code: status.code });
        }

        stats.packages_installed = specs.len();
        Ok(())
    }

    /// Stage 7: dedupe the dependency tree after the batch install
    fn reconcile(&self) -> Result<(), WorkflowError> {
        let status = self.services.installer.reconcile(&self.dir)?;
        if !status.success {
            return Err(WorkflowError::ReconcileFailed { code: status.code });
        }
        Ok(())
    }

    /// Stages 8 and 9: the prompt-gated scripts, in order
    fn quality_gates(&self) -> Vec<(&'static str, String)> {
        let names = &self.context.script_names;
        vec![
            ("lint", names.lint.clone()),
            ("typecheck", names.typecheck.clone()),
            ("test", names.test.clone()),
            ("build", names.build.clone()),
        ]
    }

    /// Offer one script; a failing script is a warning, not a failure
    fn run_gate(
        &self,
        label: &str,
        name: &str,
        warnings: &mut Vec<String>,
    ) -> Result<StepResult<()>, WorkflowError> {
        if !self.context.has_script(name) {
            return Ok(StepResult::Continue(()));
        }

        let question = format!("Run the {} script (npm run {})?", label, name);
        match confirm_or_cancel(self.services.gate.as_ref(), &question)? {
            StepResult::Continue(true) => {}
            StepResult::Continue(false) => return Ok(StepResult::Continue(())),
            StepResult::Exit(reason) => return Ok(StepResult::Exit(reason)),
        }

        let status = self.services.scripts.run_script(name, &self.dir)?;
        if !status.success {
            let warning = format!("{} script failed (npm run {})", label, name);
            if !self.quiet {
                println!("  {} {}", "warn".yellow(), warning);
            }
            warnings.push(warning);
        }
        Ok(StepResult::Continue(()))
    }
}

/// Turn the checker's name-to-version map into update candidates.
///
/// Names the manifest does not declare are ignored, and the proposed
/// version is stripped of range operators so later stages always see a
/// concrete version.
fn candidates_from(
    upgraded: &BTreeMap<String, String>,
    context: &ExecutionContext,
) -> Vec<PackageUpdate> {
    upgraded
        .iter()
        .filter_map(|(name, new_version)| {
            let current = context.all_dependencies.get(name)?;
            Some(PackageUpdate::new(name, current, clean_version(new_version)))
        })
        .collect()
}

fn finish(
    reason: ExitReason,
    mut stats: WorkflowStats,
    warnings: Vec<String>,
    started: Instant,
) -> WorkflowResult {
    stats.duration_ms = started.elapsed().as_millis() as u64;
    WorkflowResult::from_reason(reason, stats, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScriptNames;
    use crate::manifest::Manifest;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn context_with(deps: &[(&str, &str)]) -> ExecutionContext {
        let mut manifest = Manifest::default();
        for (name, version) in deps {
            manifest
                .dependencies
                .insert(name.to_string(), version.to_string());
        }
        ExecutionContext::with_now(&manifest, 7, ScriptNames::default(), Utc::now())
    }

    #[test]
    fn test_candidates_skip_undeclared_packages() {
        let context = context_with(&[("express", "^4.18.0")]);
        let mut upgraded = BTreeMap::new();
        upgraded.insert("express".to_string(), "^4.19.2".to_string());
        upgraded.insert("phantom".to_string(), "^1.0.0".to_string());

        let candidates = candidates_from(&upgraded, &context);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "express");
    }

    #[test]
    fn test_candidates_strip_range_prefix_from_new_version() {
        let context = context_with(&[("lodash", "~4.17.20")]);
        let mut upgraded = BTreeMap::new();
        upgraded.insert("lodash".to_string(), "~4.17.21".to_string());

        let candidates = candidates_from(&upgraded, &context);
        assert_eq!(candidates[0].current_version, "~4.17.20");
        assert_eq!(candidates[0].new_version, "4.17.21");
    }

    #[test]
    fn test_candidates_keep_checker_order() {
        let context = context_with(&[("axios", "^1.6.0"), ("express", "^4.18.0")]);
        let mut upgraded = BTreeMap::new();
        upgraded.insert("express".to_string(), "^4.19.2".to_string());
        upgraded.insert("axios".to_string(), "^1.7.0".to_string());

        let names: Vec<_> = candidates_from(&upgraded, &context)
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["axios", "express"]);
    }

    #[test]
    fn test_finish_records_duration() {
        let result = finish(
            ExitReason::Completed,
            WorkflowStats::new(),
            Vec::new(),
            Instant::now(),
        );
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }
}
