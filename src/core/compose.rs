//! Install bundle composition
//!
//! Merges completed targets' package directories into named
//! distributable bundles per the manifest's install declarations. A
//! bundle whose prerequisite targets were not all selected and
//! successful is skipped entirely: a partial bundle is worse than a
//! missing one, so nothing is written for it, not even the scratch
//! directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::archive::{self, ArchiveFormat};
use crate::core::manifest::{AssetSpec, InstallSpec};
use crate::error::{ArchiveError, ComposeError};
use crate::infra::filesystem;

/// Final state of one selected target, as the composer sees it
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    /// Whether the target's pipeline succeeded
    pub succeeded: bool,
    /// Its package directory (populated only on success)
    pub package_dir: PathBuf,
}

/// Run-wide inputs shared by every bundle composition
#[derive(Debug)]
pub struct ComposeContext<'a> {
    /// Build root holding scratch dirs, bundles and the shared asset
    pub build_root: &'a Path,
    /// Checked-out source tree, for extra static files
    pub source_tree: &'a Path,
    /// Shared auxiliary asset declaration, if the manifest has one
    pub asset: Option<&'a AssetSpec>,
    /// Outcomes keyed by os id, for targets selected this run only
    pub targets: &'a HashMap<String, TargetOutcome>,
}

/// Result of composing one bundle
#[derive(Debug)]
pub enum ComposeOutcome {
    /// Bundle archived at this path
    Archived(PathBuf),
    /// Prerequisites unmet; nothing was written
    Skipped { missing: Vec<String> },
}

/// Compose one install bundle
///
/// Errors are scoped to this bundle; the caller continues with the
/// next one. Any partially-written scratch directory or archive is
/// removed before the error is returned.
pub async fn compose(
    spec: &InstallSpec,
    ctx: &ComposeContext<'_>,
) -> Result<ComposeOutcome, ComposeError> {
    // Prerequisite check happens before any filesystem work
    let missing: Vec<String> = spec
        .layout
        .keys()
        .filter(|os| !ctx.targets.get(*os).is_some_and(|t| t.succeeded))
        .cloned()
        .collect();
    if !missing.is_empty() {
        tracing::info!(
            "Skipping bundle '{}': missing targets {missing:?}",
            spec.archive
        );
        return Ok(ComposeOutcome::Skipped { missing });
    }

    let format = spec
        .format
        .ok_or_else(|| ArchiveError::UnrecognizedFormat {
            name: spec.archive.clone(),
        })?;

    let scratch = ctx.build_root.join(format!("install-{}", spec.stem()));
    let archive_path = ctx.build_root.join(&spec.archive);

    let result = compose_inner(spec, ctx, format, &scratch, &archive_path).await;
    if result.is_err() {
        let _ = filesystem::remove_dir_all(&scratch);
        let _ = std::fs::remove_file(&archive_path);
    }
    result?;

    tracing::info!("Composed bundle {}", archive_path.display());
    Ok(ComposeOutcome::Archived(archive_path))
}

async fn compose_inner(
    spec: &InstallSpec,
    ctx: &ComposeContext<'_>,
    format: ArchiveFormat,
    scratch: &Path,
    archive_path: &Path,
) -> Result<(), ComposeError> {
    // Fresh scratch dir per run
    filesystem::remove_dir_all(scratch)?;
    filesystem::create_dir_all(scratch)?;

    for (os, dest) in &spec.layout {
        let outcome = ctx
            .targets
            .get(os)
            .expect("prerequisites verified above");
        filesystem::copy_dir_all(&outcome.package_dir, &scratch.join(bundle_rel(dest)))?;
    }

    if let Some(dest) = &spec.asset_dest {
        let asset = ctx.asset.ok_or_else(|| ComposeError::MissingAsset {
            name: "asset".to_string(),
        })?;
        let produced = ctx.build_root.join(&asset.name);
        if !produced.is_file() {
            return Err(ComposeError::MissingAsset {
                name: asset.name.clone(),
            });
        }
        filesystem::copy_file(&produced, &scratch.join(bundle_rel(dest)).join(&asset.name))?;
    }

    for (dest, src) in &spec.extra {
        let src_path = ctx.source_tree.join(src);
        if !src_path.is_file() {
            return Err(ComposeError::MissingExtra { path: src_path });
        }
        filesystem::copy_file(&src_path, &scratch.join(bundle_rel(dest)))?;
    }

    if archive_path.exists() {
        std::fs::remove_file(archive_path).map_err(|e| {
            ComposeError::Filesystem(crate::error::FilesystemError::Copy {
                from: archive_path.to_path_buf(),
                to: archive_path.to_path_buf(),
                error: e.to_string(),
            })
        })?;
    }
    archive::create(format, scratch, archive_path).await?;
    Ok(())
}

/// Bundle destinations are declared absolute-like ("/", "/linux32");
/// resolve them relative to the scratch root.
fn bundle_rel(dest: &str) -> &Path {
    Path::new(dest.trim_start_matches('/'))
}
