//! Archive format handling
//!
//! Bundle and dependency archives keep their extension-based naming
//! contract (`.zip`, `.tar.gz`, `.tar.xz`), but internally the format is
//! resolved once into [`ArchiveFormat`] at configuration time instead of
//! re-parsing the file name at every use site. The actual compression is
//! delegated to the system `zip`/`unzip`/`tar` tools, invoked with
//! explicit argument lists.

use std::path::Path;

use crate::error::ArchiveError;
use crate::infra::process::CommandSpec;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.xz`
    TarXz,
}

impl ArchiveFormat {
    /// Resolve a format from a file name's extension
    pub fn from_name(name: &str) -> Result<Self, ArchiveError> {
        if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar.xz") {
            Ok(Self::TarXz)
        } else {
            Err(ArchiveError::UnrecognizedFormat {
                name: name.to_string(),
            })
        }
    }

    /// The extension this format was resolved from
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::TarGz => ".tar.gz",
            Self::TarXz => ".tar.xz",
        }
    }

    /// File name with the archive extension removed
    ///
    /// `doom-win32.zip` becomes `doom-win32`; `.tgz` names keep their
    /// stem the same way.
    pub fn stem(name: &str) -> Result<String, ArchiveError> {
        for ext in [".tar.gz", ".tar.xz", ".tgz", ".zip"] {
            if let Some(stem) = name.strip_suffix(ext) {
                return Ok(stem.to_string());
            }
        }
        Err(ArchiveError::UnrecognizedFormat {
            name: name.to_string(),
        })
    }

    /// Command that unpacks `archive` into the directory `dest`
    ///
    /// `dest` must already exist; tar does not create it.
    pub fn extract_command(self, archive: &Path, dest: &Path) -> CommandSpec {
        match self {
            Self::Zip => CommandSpec::new(
                "unzip",
                [
                    "-o".to_string(),
                    archive.display().to_string(),
                    "-d".to_string(),
                    dest.display().to_string(),
                ],
            ),
            Self::TarGz => CommandSpec::new(
                "tar",
                [
                    "-xzf".to_string(),
                    archive.display().to_string(),
                    "-C".to_string(),
                    dest.display().to_string(),
                ],
            ),
            Self::TarXz => CommandSpec::new(
                "tar",
                [
                    "-xJf".to_string(),
                    archive.display().to_string(),
                    "-C".to_string(),
                    dest.display().to_string(),
                ],
            ),
        }
    }

    /// Command that packs the contents of `dir` into `archive`
    pub fn create_command(self, dir: &Path, archive: &Path) -> CommandSpec {
        match self {
            // zip resolves paths relative to its cwd, so run it inside the
            // composition directory to avoid embedding absolute paths
            Self::Zip => CommandSpec::new(
                "zip",
                [
                    "-r".to_string(),
                    "-q".to_string(),
                    archive.display().to_string(),
                    ".".to_string(),
                ],
            )
            .with_cwd(dir.to_path_buf()),
            Self::TarGz => CommandSpec::new(
                "tar",
                [
                    "-czf".to_string(),
                    archive.display().to_string(),
                    "-C".to_string(),
                    dir.display().to_string(),
                    ".".to_string(),
                ],
            ),
            Self::TarXz => CommandSpec::new(
                "tar",
                [
                    "-cJf".to_string(),
                    archive.display().to_string(),
                    "-C".to_string(),
                    dir.display().to_string(),
                    ".".to_string(),
                ],
            ),
        }
    }
}

/// Pack the contents of `dir` into `archive` using `format`
///
/// Unpacking has no counterpart here: the runner executes
/// [`ArchiveFormat::extract_command`] through the logged subprocess
/// layer so extraction output lands in the target's build log.
pub async fn create(format: ArchiveFormat, dir: &Path, archive: &Path) -> Result<(), ArchiveError> {
    let spec = format.create_command(dir, archive);
    run_tool(&spec, archive).await
}

async fn run_tool(spec: &CommandSpec, subject: &Path) -> Result<(), ArchiveError> {
    let mut cmd = tokio::process::Command::new(&spec.program);
    cmd.args(&spec.args);
    if let Some(ref cwd) = spec.cwd {
        cmd.current_dir(cwd);
    }

    let output = cmd.output().await.map_err(|e| ArchiveError::SpawnFailed {
        program: spec.program.clone(),
        error: e.to_string(),
    })?;

    if output.status.success() {
        Ok(())
    } else {
        tracing::debug!(
            "{} stderr: {}",
            spec.program,
            String::from_utf8_lossy(&output.stderr)
        );
        Err(ArchiveError::ToolFailed {
            program: spec.program.clone(),
            status: output.status.to_string(),
            path: subject.to_path_buf(),
        })
    }
}
