//! Command-line interface

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::context::{ScriptNames, DEFAULT_SAFETY_DAYS};
use crate::domain::PackageSpec;

#[derive(Debug, Parser)]
#[command(
    name = "depshield",
    version,
    about = "Safety layer for npm dependency updates",
    long_about = "Updates and adds npm dependencies with a publish-age safety buffer, \
                  a pre-install security scan, and script-disabled installs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively update outdated dependencies
    Update(UpdateArgs),
    /// Add a dependency through the same safety checks
    Add(AddArgs),
}

#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Minimum age, in days, a release must have before it is eligible
    #[arg(long, default_value_t = DEFAULT_SAFETY_DAYS)]
    pub days: u32,

    /// Project directory containing package.json
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Suppress progress output
    #[arg(long, short)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Name of the lint script in package.json
    #[arg(long, default_value = "lint")]
    pub lint_script: String,

    /// Name of the typecheck script in package.json
    #[arg(long, default_value = "typecheck")]
    pub typecheck_script: String,

    /// Name of the test script in package.json
    #[arg(long, default_value = "test")]
    pub test_script: String,

    /// Name of the build script in package.json
    #[arg(long, default_value = "build")]
    pub build_script: String,
}

impl UpdateArgs {
    pub fn script_names(&self) -> ScriptNames {
        ScriptNames {
            lint: self.lint_script.clone(),
            typecheck: self.typecheck_script.clone(),
            test: self.test_script.clone(),
            build: self.build_script.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Package to add, as `name` or `name@version`
    #[arg(value_parser = PackageSpec::parse)]
    pub package: PackageSpec,

    /// Add to devDependencies instead of dependencies
    #[arg(long)]
    pub save_dev: bool,
}
