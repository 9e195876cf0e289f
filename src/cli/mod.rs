//! Command-line interface module
//!
//! This module handles argument parsing and result presentation.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::defaults;
use crate::core::manifest::Manifest;
use crate::core::orchestrator::{self, BundleOutcome, RunOptions, RunReport};

/// Nightbuild - nightly cross-platform build and release orchestrator
///
/// Builds every target declared in the manifest, composes install
/// bundles from the ones that succeeded, and publishes them to a
/// revision-addressed release store.
#[derive(Parser, Debug)]
#[command(name = "nightbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Build only this target (os id from the manifest); default is all
    pub target: Option<String>,

    /// Path to the build manifest
    #[arg(short, long, default_value = defaults::MANIFEST_FILE)]
    pub manifest: PathBuf,

    /// Directory for per-target workspaces (recreated every run)
    #[arg(long, default_value = defaults::BUILD_ROOT)]
    pub build_root: PathBuf,

    /// Root of the release store
    #[arg(long, default_value = defaults::RELEASE_ROOT)]
    pub release_root: PathBuf,

    /// Parallel compile jobs per target (defaults to the CPU count)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output the run summary in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,
}

impl Cli {
    /// Execute the run
    pub async fn run(self) -> Result<()> {
        let manifest = Manifest::load(&self.manifest)
            .with_context(|| format!("Failed to load manifest {}", self.manifest.display()))?;

        let opts = RunOptions {
            only_target: self.target.clone(),
            build_root: self.build_root.clone(),
            release_root: self.release_root.clone(),
            jobs: self.jobs.unwrap_or_else(num_cpus::get),
        };

        let report = orchestrator::run(&manifest, &opts).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
        } else if !self.quiet {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    println!("Revision {}", report.revision);
    for target in &report.targets {
        let mark = if target.succeeded {
            output::status::SUCCESS
        } else {
            output::status::ERROR
        };
        println!("  {mark} {} (log: {})", target.os, target.log.display());
    }
    for bundle in &report.bundles {
        match &bundle.outcome {
            BundleOutcome::Archived(path) => {
                println!("  {} {}", output::status::SUCCESS, path.display());
            }
            BundleOutcome::Skipped(missing) => {
                println!(
                    "  {} {} skipped (missing {})",
                    output::status::WARNING,
                    bundle.archive,
                    missing.join(", ")
                );
            }
            BundleOutcome::Failed(reason) => {
                println!(
                    "  {} {} failed: {reason}",
                    output::status::ERROR,
                    bundle.archive
                );
            }
        }
    }
    println!("Published to {}", report.published.revision_dir.display());
}

fn report_json(report: &RunReport) -> serde_json::Value {
    serde_json::json!({
        "revision": report.revision,
        "targets": report.targets.iter().map(|t| {
            serde_json::json!({
                "os": t.os,
                "succeeded": t.succeeded,
                "log": t.log,
            })
        }).collect::<Vec<_>>(),
        "bundles": report.bundles.iter().map(|b| {
            match &b.outcome {
                BundleOutcome::Archived(path) => serde_json::json!({
                    "archive": b.archive,
                    "status": "archived",
                    "path": path,
                }),
                BundleOutcome::Skipped(missing) => serde_json::json!({
                    "archive": b.archive,
                    "status": "skipped",
                    "missing": missing,
                }),
                BundleOutcome::Failed(reason) => serde_json::json!({
                    "archive": b.archive,
                    "status": "failed",
                    "reason": reason,
                }),
            }
        }).collect::<Vec<_>>(),
        "published": {
            "revision_dir": report.published.revision_dir,
            "date_dir": report.published.date_dir,
        },
    })
}
