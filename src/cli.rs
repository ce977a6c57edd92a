//! Command-line surface: `create`, `resume` and `stat`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::{
    core::{
        checkpoint::CheckpointStore,
        engine::{CherryPickEngine, EngineOutcome},
        publish::{PublishReport, RefPublisher},
        stat::StatReporter,
        workspace::Workspace,
        ExitCode,
    },
    manifest::{Manifest, TagPolicy},
};

#[derive(Parser, Debug)]
#[command(
    name = "rebranch",
    about = "Rebuild an integration branch by cherry-picking topic branches onto a moving base",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")")
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub logging: LogArgs,
}

/// Logging flags, parsed early in main before clap runs.
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Log level (trace, debug, info, warn, error). Logging is off unless set.
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Log to a file instead of stderr.
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_file: Option<PathBuf>,

    /// Log format (text, json).
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a workspace and apply every topic from the manifest
    Create(CreateArgs),
    /// Resume a conflicted run from its workspace checkpoint
    Resume(ResumeArgs),
    /// Report per-tag commit counts between two refs
    Stat(StatArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path to the source repository
    pub repo: PathBuf,

    /// Path to the rebase manifest
    #[arg(short, long, help_heading = "Plan")]
    pub manifest: PathBuf,

    /// Name of the branch to build
    #[arg(short = 'b', long, help_heading = "Plan")]
    pub create_branch: String,

    /// Push a topic-<name> tag for every applied pick topic
    #[arg(long, help_heading = "Tagging")]
    pub tags: bool,

    /// Suffix appended to generated topic tags
    #[arg(long, help_heading = "Tagging")]
    pub tags_suffix: Option<String>,

    #[command(flatten)]
    pub cleanup: CleanupArgs,
}

#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Path to the workspace left behind by a conflicted run
    pub workspace: PathBuf,

    #[command(flatten)]
    pub cleanup: CleanupArgs,
}

/// Workspace retention overrides.
///
/// Default policy: delete on success, keep on conflict.
#[derive(Args, Debug, Default)]
pub struct CleanupArgs {
    /// Keep the workspace even after a fully successful run
    #[arg(long, help_heading = "Cleanup", conflicts_with = "delete_temp")]
    pub keep_temp: bool,

    /// Delete the workspace even on conflict (discards the checkpoint)
    #[arg(long, help_heading = "Cleanup")]
    pub delete_temp: bool,
}

#[derive(Args, Debug)]
pub struct StatArgs {
    /// Path to the repository to inspect
    pub repo: PathBuf,

    /// Lower bound of the range (exclusive)
    #[arg(long, help_heading = "Range")]
    pub base: String,

    /// Upper bound of the range (inclusive)
    #[arg(long, help_heading = "Range")]
    pub tip: String,
}

/// Dispatch a parsed invocation.
pub fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Create(args) => run_create(&args),
        Commands::Resume(args) => run_resume(&args),
        Commands::Stat(args) => run_stat(&args),
    }
}

/// Fresh run: build a workspace and apply the whole plan.
pub fn run_create(args: &CreateArgs) -> Result<ExitCode> {
    let manifest = Manifest::load(&args.manifest)?;
    let source = std::fs::canonicalize(&args.repo)
        .with_context(|| format!("cannot resolve repository path {}", args.repo.display()))?;

    let tags = TagPolicy {
        persistent: args.tags,
        suffix: args.tags_suffix.clone(),
    };

    let workspace = Workspace::create(&source, &args.create_branch, &manifest)?;
    info!(workspace = %workspace.path().display(), "starting run");

    let engine = CherryPickEngine::new(
        workspace.path(),
        &manifest,
        &source,
        args.create_branch.clone(),
        tags,
    );
    let outcome = engine.run()?;
    conclude(outcome, workspace, &manifest.rr_cache, &args.cleanup)
}

/// Resume a conflicted run from its checkpoint.
pub fn run_resume(args: &ResumeArgs) -> Result<ExitCode> {
    let workspace = Workspace::open(&args.workspace)?;
    let (manifest, resume) = CheckpointStore::load(workspace.path())?;
    info!(
        topic = %resume.conflict_topic,
        branch = %resume.branch,
        "resuming conflicted run"
    );

    let engine = CherryPickEngine::new(
        workspace.path(),
        &manifest,
        &resume.repo,
        resume.branch.clone(),
        resume.tags.clone(),
    );
    let rr_cache = resume.rr_cache.clone();
    let outcome = engine.resume(&resume)?;
    conclude(outcome, workspace, &rr_cache, &args.cleanup)
}

/// Shared tail of create and resume: publish or report the conflict,
/// then apply the cleanup policy.
fn conclude(
    outcome: EngineOutcome,
    workspace: Workspace,
    rr_cache: &std::path::Path,
    cleanup: &CleanupArgs,
) -> Result<ExitCode> {
    match outcome {
        EngineOutcome::Completed { refs } => {
            let report = RefPublisher::new(workspace.path()).publish(rr_cache, &refs)?;
            print_publish_report(&report);

            if report.is_clean() {
                if cleanup.keep_temp {
                    println!("Workspace kept at {}", workspace.path().display());
                } else {
                    workspace.delete();
                }
                Ok(ExitCode::Success)
            } else {
                // Failed pushes can be retried from the workspace by hand
                println!("Workspace kept at {}", workspace.path().display());
                Ok(ExitCode::GeneralError)
            }
        }
        EngineOutcome::Conflict {
            topic,
            checkpoint,
            files,
        } => {
            println!("Conflict while applying topic '{topic}':");
            for file in &files {
                println!("  {file}");
            }
            if cleanup.delete_temp {
                workspace.delete();
                println!("Workspace deleted as requested; this run cannot be resumed.");
            } else {
                println!(
                    "Resolve the conflict in {}, commit it with `git cherry-pick --continue`,",
                    checkpoint
                        .parent()
                        .unwrap_or(workspace.path())
                        .display()
                );
                println!(
                    "then run: rebranch resume {}",
                    workspace.path().display()
                );
            }
            Ok(ExitCode::Conflict)
        }
    }
}

fn print_publish_report(report: &PublishReport) {
    for reference in &report.pushed {
        println!("Pushed {reference}");
    }
    for (reference, error) in &report.failed {
        println!("FAILED {reference}: {error}");
    }
}

/// Read-only segment report.
pub fn run_stat(args: &StatArgs) -> Result<ExitCode> {
    let repo = std::fs::canonicalize(&args.repo)
        .with_context(|| format!("cannot resolve repository path {}", args.repo.display()))?;

    let report = StatReporter::new(&repo).report(&args.base, &args.tip)?;

    println!("{:<40} {:>8} {:>7}", "TAG", "COMMITS", "%");
    for segment in &report.segments {
        println!(
            "{:<40} {:>8} {:>6.1}%",
            segment.label,
            segment.commits,
            report.percentage(segment)
        );
    }
    println!("{:<40} {:>8}", "TOTAL", report.total);

    Ok(ExitCode::Success)
}
