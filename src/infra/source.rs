//! Source tree checkout
//!
//! Obtains the source tree to build, either by shallow-cloning a git
//! repository with the gix crate or by copying a local working tree, and
//! resolves the revision identifier the release store is keyed by.

use std::path::{Path, PathBuf};

use gix::remote::fetch::Shallow;

use crate::error::SourceError;
use crate::infra::filesystem;

/// Where the source tree comes from
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// Clone a git repository
    Repo { url: String },
    /// Copy an existing local working tree
    Local { path: PathBuf },
}

/// A checked-out source tree ready to be copied into target workspaces
#[derive(Debug, Clone)]
pub struct SourceTree {
    /// Root of the checked-out tree
    pub path: PathBuf,
    /// Revision identifier (abbreviated commit id, or "local")
    pub revision: String,
}

/// Materialize the source tree at `dest` and resolve its revision
pub fn checkout(spec: &SourceSpec, dest: &Path) -> Result<SourceTree, SourceError> {
    match spec {
        SourceSpec::Repo { url } => clone_repo(url, dest),
        SourceSpec::Local { path } => copy_local(path, dest),
    }
}

fn clone_repo(url: &str, dest: &Path) -> Result<SourceTree, SourceError> {
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| SourceError::Io {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;
    }

    tracing::info!("Cloning {url}");

    let clone_err = |e: &dyn std::fmt::Display| SourceError::CloneFailed {
        url: url.to_string(),
        error: e.to_string(),
    };

    let mut prepare = gix::prepare_clone(url, dest).map_err(|e| clone_err(&e))?;
    prepare = prepare.with_shallow(Shallow::DepthAtRemote(
        1.try_into().expect("non-zero depth"),
    ));

    let (mut checkout, _outcome) = prepare
        .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
        .map_err(|e| clone_err(&e))?;

    let (repo, _outcome) = checkout
        .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
        .map_err(|e| clone_err(&e))?;

    let revision = head_revision(&repo).map_err(|e| SourceError::ResolveFailed {
        path: dest.to_path_buf(),
        error: e,
    })?;

    Ok(SourceTree {
        path: dest.to_path_buf(),
        revision,
    })
}

fn copy_local(path: &Path, dest: &Path) -> Result<SourceTree, SourceError> {
    if !path.is_dir() {
        return Err(SourceError::LocalNotFound {
            path: path.to_path_buf(),
        });
    }

    filesystem::remove_dir_all(dest).map_err(|e| SourceError::Io {
        path: dest.to_path_buf(),
        error: e.to_string(),
    })?;
    filesystem::copy_dir_all(path, dest).map_err(|e| SourceError::Io {
        path: dest.to_path_buf(),
        error: e.to_string(),
    })?;

    // A local tree that is not under git still builds; it just publishes
    // under the "local" revision.
    let revision = match gix::discover(path) {
        Ok(repo) => head_revision(&repo).unwrap_or_else(|e| {
            tracing::warn!("Could not resolve HEAD for {}: {e}", path.display());
            "local".to_string()
        }),
        Err(_) => {
            tracing::warn!("{} is not a git repository, using revision 'local'", path.display());
            "local".to_string()
        }
    };

    Ok(SourceTree {
        path: dest.to_path_buf(),
        revision,
    })
}

/// Abbreviated HEAD commit id of a repository
fn head_revision(repo: &gix::Repository) -> Result<String, String> {
    let id = repo.head_id().map_err(|e| e.to_string())?;
    Ok(id.to_hex_with_len(12).to_string())
}
