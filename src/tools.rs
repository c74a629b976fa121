//! External tool boundary
//!
//! Thin invokers for the binaries the workflow delegates to: the
//! update-discovery tool, the package-quality scanner, the
//! firewall-wrapped installer and the npm script runner. Each is a trait
//! so the pipeline can be driven by mocks in tests; only the argument
//! vectors are specified here, never the tools' internals.

use crate::error::ToolError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandStatus {
    fn from_status(status: std::process::ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Discovers newer versions for every declared dependency
pub trait UpdateChecker: Send + Sync {
    /// Returns a map of package name to newer version string; empty when
    /// everything is current
    fn check_updates(&self, dir: &Path) -> Result<BTreeMap<String, String>, ToolError>;
}

/// Runs the package-quality scanner against one package spec
pub trait SecurityScanner: Send + Sync {
    /// True when the scan passed; only the exit status is consumed
    fn scan(&self, spec: &str, dir: &Path) -> Result<bool, ToolError>;
}

/// Options for an installer invocation
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub save_dev: bool,
    /// "not published after" bound handed to the installer
    pub before: DateTime<Utc>,
}

/// The firewall-wrapped installer plus dependency-tree reconciliation
pub trait Installer: Send + Sync {
    /// Install all specs in one invocation
    fn install(
        &self,
        specs: &[String],
        options: &InstallOptions,
        dir: &Path,
    ) -> Result<CommandStatus, ToolError>;

    /// Reconcile the dependency tree after installing
    fn reconcile(&self, dir: &Path) -> Result<CommandStatus, ToolError>;
}

/// Runs project scripts for the quality gates
pub trait ScriptRunner: Send + Sync {
    fn run_script(&self, name: &str, dir: &Path) -> Result<CommandStatus, ToolError>;
}

/// Update discovery via npm-check-updates
#[derive(Debug, Default)]
pub struct NcuUpdateChecker;

impl NcuUpdateChecker {
    pub fn new() -> Self {
        Self
    }
}

impl UpdateChecker for NcuUpdateChecker {
    fn check_updates(&self, dir: &Path) -> Result<BTreeMap<String, String>, ToolError> {
        let output = Command::new("ncu")
            .arg("--jsonUpgraded")
            .current_dir(dir)
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ToolError::launch("ncu", e))?;

        if !output.status.success() {
            return Err(ToolError::malformed(
                "ncu",
                format!("exited with status {:?}", output.status.code()),
            ));
        }

        parse_upgraded_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the `--jsonUpgraded` output: a JSON object of name → version
fn parse_upgraded_json(stdout: &str) -> Result<BTreeMap<String, String>, ToolError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(trimmed).map_err(|e| ToolError::malformed("ncu", e.to_string()))
}

/// Package-quality scanning via npq in dry-run mode
#[derive(Debug, Default)]
pub struct NpqScanner;

impl NpqScanner {
    pub fn new() -> Self {
        Self
    }
}

impl SecurityScanner for NpqScanner {
    fn scan(&self, spec: &str, dir: &Path) -> Result<bool, ToolError> {
        let status = Command::new("npq")
            .args(["install", "--dry-run", spec])
            .current_dir(dir)
            .status()
            .map_err(|e| ToolError::launch("npq", e))?;

        Ok(status.success())
    }
}

/// The installer invocation, firewall-wrapped when available
#[derive(Debug)]
pub struct FirewallInstaller {
    program: &'static str,
}

impl FirewallInstaller {
    /// Prefer the firewall-wrapped binary, fall back to plain npm
    pub fn detect() -> Self {
        let program = if Command::new("safe-npm")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
        {
            "safe-npm"
        } else {
            "npm"
        };
        Self { program }
    }

    /// Force a specific installer binary
    pub fn with_program(program: &'static str) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &str {
        self.program
    }
}

/// Argument vector for an install invocation: exact versions only, scripts
/// disabled, and the publish-date bound matching the run's cutoff
fn install_args(specs: &[String], options: &InstallOptions) -> Vec<String> {
    let mut args = vec![
        "install".to_string(),
        "--save-exact".to_string(),
        "--ignore-scripts".to_string(),
        format!("--before={}", options.before.to_rfc3339()),
    ];
    if options.save_dev {
        args.push("--save-dev".to_string());
    }
    args.extend(specs.iter().cloned());
    args
}

impl Installer for FirewallInstaller {
    fn install(
        &self,
        specs: &[String],
        options: &InstallOptions,
        dir: &Path,
    ) -> Result<CommandStatus, ToolError> {
        let status = Command::new(self.program)
            .args(install_args(specs, options))
            .current_dir(dir)
            .status()
            .map_err(|e| ToolError::launch(self.program, e))?;

        Ok(CommandStatus::from_status(status))
    }

    fn reconcile(&self, dir: &Path) -> Result<CommandStatus, ToolError> {
        let status = Command::new("npm")
            .arg("dedupe")
            .current_dir(dir)
            .status()
            .map_err(|e| ToolError::launch("npm", e))?;

        Ok(CommandStatus::from_status(status))
    }
}

/// Quality-gate scripts via `npm run`
#[derive(Debug, Default)]
pub struct NpmScriptRunner;

impl NpmScriptRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptRunner for NpmScriptRunner {
    fn run_script(&self, name: &str, dir: &Path) -> Result<CommandStatus, ToolError> {
        let status = Command::new("npm")
            .args(["run", name])
            .current_dir(dir)
            .status()
            .map_err(|e| ToolError::launch("npm", e))?;

        Ok(CommandStatus::from_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 25, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_upgraded_json_empty() {
        assert!(parse_upgraded_json("").unwrap().is_empty());
        assert!(parse_upgraded_json("{}").unwrap().is_empty());
        assert!(parse_upgraded_json("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_upgraded_json_map() {
        let parsed = parse_upgraded_json(r#"{"lodash": "^4.18.0", "express": "^5.0.0"}"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["lodash"], "^4.18.0");
    }

    #[test]
    fn test_parse_upgraded_json_invalid() {
        assert!(parse_upgraded_json("not json").is_err());
        assert!(parse_upgraded_json("[1,2]").is_err());
    }

    #[test]
    fn test_install_args_base_flags() {
        let options = InstallOptions {
            save_dev: false,
            before: cutoff(),
        };
        let args = install_args(&["lodash@4.17.21".to_string()], &options);

        assert_eq!(args[0], "install");
        assert!(args.contains(&"--save-exact".to_string()));
        assert!(args.contains(&"--ignore-scripts".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--before=2024-05-25")));
        assert!(!args.contains(&"--save-dev".to_string()));
        assert_eq!(args.last().unwrap(), "lodash@4.17.21");
    }

    #[test]
    fn test_install_args_save_dev() {
        let options = InstallOptions {
            save_dev: true,
            before: cutoff(),
        };
        let args = install_args(&["typescript@5.4.5".to_string()], &options);
        assert!(args.contains(&"--save-dev".to_string()));
    }

    #[test]
    fn test_install_args_batched_specs() {
        let options = InstallOptions {
            save_dev: false,
            before: cutoff(),
        };
        let specs = vec![
            "a@1.0.0".to_string(),
            "b@2.0.0".to_string(),
            "c@3.0.0".to_string(),
        ];
        let args = install_args(&specs, &options);
        // All specs in one invocation, in order
        let tail: Vec<_> = args.iter().rev().take(3).rev().cloned().collect();
        assert_eq!(tail, specs);
    }

    #[test]
    fn test_firewall_installer_with_program() {
        let installer = FirewallInstaller::with_program("npm");
        assert_eq!(installer.program(), "npm");
    }
}
