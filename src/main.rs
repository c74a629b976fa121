//! depshield - npm dependency updates with a safety buffer
//!
//! `depshield update` walks the interactive update pipeline;
//! `depshield add` resolves and installs one package through the same
//! age and security checks.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::signal::unix::{signal, SignalKind};

use depshield::cli::{AddArgs, Cli, Command, CommonArgs, UpdateArgs};
use depshield::context::{ExecutionContext, ScriptNames};
use depshield::domain::{ExitReason, WorkflowResult, EXIT_CODE_CANCELLED};
use depshield::manifest::Manifest;
use depshield::prompt::TerminalGate;
use depshield::registry::{HttpClient, NpmMetadataSource};
use depshield::resolver::VersionResolver;
use depshield::tools::{FirewallInstaller, NcuUpdateChecker, NpmScriptRunner, NpqScanner};
use depshield::workflow::{AddWorkflow, UpdateWorkflow, WorkflowServices};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    spawn_signal_handler();

    match run(cli).await {
        Ok(result) => {
            report(&result);
            ExitCode::from(result.exit_code)
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Exit 130 on SIGINT or SIGTERM, matching a prompt aborted at the
/// keyboard. No install is in flight while prompts are open, so the
/// "no changes" message holds.
fn spawn_signal_handler() {
    tokio::spawn(async {
        let sigint = signal(SignalKind::interrupt());
        let sigterm = signal(SignalKind::terminate());
        if let (Ok(mut sigint), Ok(mut sigterm)) = (sigint, sigterm) {
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            eprintln!("\n{}", ExitReason::UserCancelled.message());
            std::process::exit(i32::from(EXIT_CODE_CANCELLED));
        }
    });
}

async fn run(cli: Cli) -> anyhow::Result<WorkflowResult> {
    let result = match cli.command {
        Command::Update(args) => run_update(args).await?,
        Command::Add(args) => run_add(args).await?,
    };
    Ok(result)
}

async fn run_update(args: UpdateArgs) -> anyhow::Result<WorkflowResult> {
    let (context, resolver, services) = wire(&args.common, args.script_names())?;
    let workflow = UpdateWorkflow::new(
        context,
        resolver,
        services,
        args.common.dir.clone(),
        args.common.quiet,
    );
    Ok(workflow.run().await?)
}

async fn run_add(args: AddArgs) -> anyhow::Result<WorkflowResult> {
    let (context, resolver, services) = wire(&args.common, ScriptNames::default())?;
    let workflow = AddWorkflow::new(
        context,
        resolver,
        services,
        args.common.dir.clone(),
        args.common.quiet,
    );
    Ok(workflow.run(&args.package, args.save_dev).await?)
}

/// Load the manifest and build the context, resolver, and live services
fn wire(
    common: &CommonArgs,
    script_names: ScriptNames,
) -> anyhow::Result<(ExecutionContext, VersionResolver, WorkflowServices)> {
    let manifest = Manifest::load(&common.dir)?;
    let context = ExecutionContext::new(&manifest, common.days, script_names);

    let source = Arc::new(NpmMetadataSource::new(HttpClient::new()?));
    let resolver = VersionResolver::new(source, &context);

    let services = WorkflowServices {
        checker: Arc::new(NcuUpdateChecker::new()),
        scanner: Arc::new(NpqScanner::new()),
        installer: Arc::new(FirewallInstaller::detect()),
        scripts: Arc::new(NpmScriptRunner::new()),
        gate: Arc::new(TerminalGate::new()),
    };

    Ok((context, resolver, services))
}

fn report(result: &WorkflowResult) {
    match result.reason {
        ExitReason::Completed => {
            println!(
                "{} Installed {} package(s) in {}ms",
                "Done.".green().bold(),
                result.stats.packages_installed,
                result.stats.duration_ms
            );
            for warning in &result.warnings {
                println!("  {} {}", "warn".yellow(), warning);
            }
        }
        ExitReason::UserCancelled => eprintln!("{}", result.reason.message()),
        _ => println!("{}", result.reason.message()),
    }
}
