//! Run orchestration
//!
//! Selects targets, spawns one runner task per target plus the progress
//! monitor, waits at the barrier for every runner to reach a terminal
//! state, then composes install bundles and publishes the release. The
//! phases after the barrier are strictly sequential.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use futures::future::join_all;

use crate::core::compose::{self, ComposeContext, ComposeOutcome, TargetOutcome};
use crate::core::manifest::Manifest;
use crate::core::monitor::ProgressMonitor;
use crate::core::publish::{self, PublishedRelease, ReleaseRecord};
use crate::core::runner::TargetRunner;
use crate::infra::{filesystem, source};

/// Options resolved from the CLI
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Build only the target with this os id; None builds all
    pub only_target: Option<String>,
    /// Root for per-target workspaces and composition scratch dirs
    pub build_root: PathBuf,
    /// Root of the revision-addressed release store
    pub release_root: PathBuf,
    /// Parallel compile jobs per target
    pub jobs: usize,
}

/// Outcome of one target's build
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub os: String,
    pub succeeded: bool,
    pub log: PathBuf,
}

/// Outcome of one install bundle
#[derive(Debug)]
pub struct BundleReport {
    pub archive: String,
    pub outcome: BundleOutcome,
}

/// How a bundle ended up
#[derive(Debug)]
pub enum BundleOutcome {
    /// Archived at this path
    Archived(PathBuf),
    /// Skipped because these prerequisite targets were missing or failed
    Skipped(Vec<String>),
    /// Composition failed (scoped to this bundle)
    Failed(String),
}

/// Summary of a completed run
#[derive(Debug)]
pub struct RunReport {
    pub revision: String,
    pub targets: Vec<TargetReport>,
    pub bundles: Vec<BundleReport>,
    pub published: PublishedRelease,
}

/// Execute a full build-compose-publish run
///
/// Individual target failures do not abort the run; a publish failure
/// (or a run that produced nothing to publish) does.
pub async fn run(manifest: &Manifest, opts: &RunOptions) -> Result<RunReport> {
    let selected = select_targets(manifest, opts.only_target.as_deref())?;
    preflight(manifest);

    // Every run starts from a clean workspace
    filesystem::remove_dir_all(&opts.build_root).context("Failed to clean build root")?;
    filesystem::create_dir_all(&opts.build_root).context("Failed to create build root")?;

    let tree = source::checkout(&manifest.source, &opts.build_root.join("source"))
        .context("Failed to obtain the source tree")?;
    tracing::info!("Building revision {}", tree.revision);

    let runners: Vec<TargetRunner> = selected
        .iter()
        .map(|spec| {
            TargetRunner::new(
                (*spec).clone(),
                manifest.build.clone(),
                manifest.asset.clone(),
                opts.build_root.clone(),
                tree.path.clone(),
                opts.jobs,
            )
        })
        .collect();

    let statuses: Vec<_> = runners
        .iter()
        .map(|r| (r.os().to_string(), r.status()))
        .collect();
    let package_dirs: Vec<_> = runners
        .iter()
        .map(|r| (r.os().to_string(), r.package_dir()))
        .collect();

    let monitor = tokio::spawn(ProgressMonitor::new(statuses.clone()).run());
    let handles: Vec<_> = runners
        .into_iter()
        .map(|r| tokio::spawn(r.run()))
        .collect();

    // Barrier: composition never observes an in-progress build
    join_all(handles).await;
    let _ = monitor.await;

    let targets: Vec<TargetReport> = statuses
        .iter()
        .map(|(os, status)| TargetReport {
            os: os.clone(),
            succeeded: status.outcome() == Some(true),
            log: status.log_path().clone(),
        })
        .collect();

    let outcomes: HashMap<String, TargetOutcome> = package_dirs
        .into_iter()
        .zip(targets.iter())
        .map(|((os, package_dir), report)| {
            (
                os,
                TargetOutcome {
                    succeeded: report.succeeded,
                    package_dir,
                },
            )
        })
        .collect();

    let ctx = ComposeContext {
        build_root: &opts.build_root,
        source_tree: &tree.path,
        asset: manifest.asset.as_ref(),
        targets: &outcomes,
    };

    let mut bundles = Vec::with_capacity(manifest.installs.len());
    let mut produced = Vec::new();
    for spec in &manifest.installs {
        let outcome = match compose::compose(spec, &ctx).await {
            Ok(ComposeOutcome::Archived(path)) => {
                produced.push(path.clone());
                BundleOutcome::Archived(path)
            }
            Ok(ComposeOutcome::Skipped { missing }) => BundleOutcome::Skipped(missing),
            Err(e) => {
                tracing::warn!("Bundle '{}' failed: {e}", spec.archive);
                BundleOutcome::Failed(e.to_string())
            }
        };
        bundles.push(BundleReport {
            archive: spec.archive.clone(),
            outcome,
        });
    }

    if produced.is_empty() {
        bail!("No install bundles were produced; nothing to publish");
    }

    let record = ReleaseRecord {
        revision: tree.revision.clone(),
        archives: produced,
    };
    let published =
        publish::publish(&opts.release_root, &record).context("Publishing the release failed")?;

    Ok(RunReport {
        revision: tree.revision,
        targets,
        bundles,
        published,
    })
}

/// Resolve the CLI target selection against the manifest
fn select_targets<'a>(
    manifest: &'a Manifest,
    only: Option<&str>,
) -> Result<Vec<&'a crate::core::manifest::TargetSpec>> {
    match only {
        Some(os) => {
            let spec = manifest
                .target(os)
                .with_context(|| format!("Target '{os}' is not declared in the manifest"))?;
            Ok(vec![spec])
        }
        None => Ok(manifest.targets.iter().collect()),
    }
}

/// Warn early about tools the run will need
fn preflight(manifest: &Manifest) {
    if which::which(&manifest.build.program).is_err() {
        tracing::warn!(
            "Build program '{}' not found in PATH; all targets will fail",
            manifest.build.program
        );
    }
    let needs_zip = manifest
        .installs
        .iter()
        .any(|i| i.archive.ends_with(".zip"));
    if needs_zip && which::which("zip").is_err() {
        tracing::warn!("'zip' not found in PATH; zip bundles will fail to compose");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::from_toml(
            r#"
[project]
name = "game"
[source]
repo = "https://example.invalid/game.git"
[[target]]
os = "win32"
compiler = "mingw"
binary = "game.exe"
[[target]]
os = "linux64"
compiler = "gcc"
binary = "game"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_select_all_by_default() {
        let m = manifest();
        let selected = select_targets(&m, None).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_single_target() {
        let m = manifest();
        let selected = select_targets(&m, Some("linux64")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].os, "linux64");
    }

    #[test]
    fn test_select_unknown_target_fails() {
        let m = manifest();
        assert!(select_targets(&m, Some("beos")).is_err());
    }
}
