//! Release publishing
//!
//! Stores composed bundles under a revision-addressed directory, adds a
//! date-addressed alias, and atomically repoints the floating `latest`
//! alias. `latest` is only ever replaced after every archive copy has
//! succeeded, so an observer resolving it always finds a fully-copied
//! release. Revision directories from earlier runs are never deleted;
//! re-publishing a revision is additive.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::config::defaults;
use crate::error::PublishError;
use crate::infra::filesystem;

/// What one run hands to the publisher
#[derive(Debug, Clone)]
pub struct ReleaseRecord {
    /// Source revision identifier the store is keyed by
    pub revision: String,
    /// Bundle archives produced by the composer this run
    pub archives: Vec<PathBuf>,
}

/// Where a publish landed
#[derive(Debug, Clone)]
pub struct PublishedRelease {
    /// Revision-addressed directory holding the archives
    pub revision_dir: PathBuf,
    /// Date-addressed alias created for this publish
    pub date_dir: PathBuf,
}

/// Publish a release under `release_root`
pub fn publish(release_root: &Path, record: &ReleaseRecord) -> Result<PublishedRelease, PublishError> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    publish_at(release_root, record, &timestamp)
}

/// Publish with an explicit timestamp (separated out for tests)
pub fn publish_at(
    release_root: &Path,
    record: &ReleaseRecord,
    timestamp: &str,
) -> Result<PublishedRelease, PublishError> {
    let revision_dir = release_root
        .join(defaults::BY_COMMIT_DIR)
        .join(&record.revision);
    filesystem::create_dir_all(&revision_dir)?;

    // All copies must land before any alias moves
    for archive in &record.archives {
        let name = archive.file_name().ok_or_else(|| PublishError::CopyFailed {
            archive: archive.clone(),
            dest: revision_dir.clone(),
            error: "archive path has no file name".to_string(),
        })?;
        let dest = revision_dir.join(name);
        std::fs::copy(archive, &dest).map_err(|e| PublishError::CopyFailed {
            archive: archive.clone(),
            dest,
            error: e.to_string(),
        })?;
    }

    // Date alias: distinct timestamps for one revision reference the
    // same content because both are links, not copies
    let by_date = release_root.join(defaults::BY_DATE_DIR);
    filesystem::create_dir_all(&by_date)?;
    let date_dir = by_date.join(timestamp);
    let date_target = Path::new("..")
        .join(defaults::BY_COMMIT_DIR)
        .join(&record.revision);
    std::os::unix::fs::symlink(&date_target, &date_dir).map_err(|e| {
        PublishError::AliasFailed {
            path: date_dir.clone(),
            error: e.to_string(),
        }
    })?;

    // Repoint `latest` atomically: build the link aside, rename over
    let latest = release_root.join(defaults::LATEST_LINK);
    let latest_tmp = release_root.join(".latest.tmp");
    let latest_target = Path::new(defaults::BY_COMMIT_DIR).join(&record.revision);
    let _ = std::fs::remove_file(&latest_tmp);
    std::os::unix::fs::symlink(&latest_target, &latest_tmp).map_err(|e| {
        PublishError::AliasFailed {
            path: latest_tmp.clone(),
            error: e.to_string(),
        }
    })?;
    std::fs::rename(&latest_tmp, &latest).map_err(|e| PublishError::AliasFailed {
        path: latest.clone(),
        error: e.to_string(),
    })?;

    tracing::info!(
        "Published {} archive(s) for revision {} ({timestamp})",
        record.archives.len(),
        record.revision
    );

    Ok(PublishedRelease {
        revision_dir,
        date_dir,
    })
}
