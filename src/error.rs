//! Error types for nightbuild
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Manifest loading and validation errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest not found
    #[error("Manifest not found at '{path}'")]
    NotFound { path: PathBuf },

    /// Manifest parse error
    #[error("Failed to parse manifest: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    /// No targets declared
    #[error("Manifest declares no targets")]
    NoTargets,

    /// Neither a repository nor a local path declared for the source
    #[error("Manifest [source] must declare 'repo' or 'path'")]
    NoSource,

    /// Duplicate target os id
    #[error("Duplicate target os id '{os}'")]
    DuplicateTarget { os: String },

    /// Install bundle references an undeclared target
    #[error("Install bundle '{archive}' references undeclared target '{os}'")]
    UnknownTarget { archive: String, os: String },

    /// Asset producer flagged but no [asset] table
    #[error("Target '{os}' sets builds_asset but the manifest has no [asset] table")]
    AssetNotDeclared { os: String },

    /// More than one target flagged as asset producer
    #[error("Targets '{first}' and '{second}' both set builds_asset (exactly one allowed)")]
    MultipleAssetProducers { first: String, second: String },

    /// IO error reading the manifest
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Archive format errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// File name does not end in a supported archive extension
    #[error("Unrecognized archive format for '{name}' (supported: .zip, .tar.gz, .tgz, .tar.xz)")]
    UnrecognizedFormat { name: String },

    /// Archive tool exited non-zero
    #[error("Archive tool '{program}' failed with {status} for '{path}'")]
    ToolFailed {
        program: String,
        status: String,
        path: PathBuf,
    },

    /// Archive tool could not be spawned
    #[error("Failed to run archive tool '{program}': {error}")]
    SpawnFailed { program: String, error: String },
}

/// Source checkout errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to clone repository
    #[error("Failed to clone '{url}': {error}")]
    CloneFailed { url: String, error: String },

    /// Failed to resolve the checked-out revision
    #[error("Failed to resolve revision at '{path}': {error}")]
    ResolveFailed { path: PathBuf, error: String },

    /// Local source tree missing
    #[error("Local source tree not found at '{path}'")]
    LocalNotFound { path: PathBuf },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Dependency archive fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    Network { url: String, error: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Target build pipeline errors
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Dependency archive fetch failed
    #[error("Dependency fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Dependency or source archive handling failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A pipeline subprocess exited non-zero
    #[error("Step '{step}' failed with {status}")]
    StepFailed { step: String, status: String },

    /// A pipeline subprocess could not be spawned
    #[error("Step '{step}' could not be started: {error}")]
    StepSpawn { step: String, error: String },

    /// Produced binary (or asset) not found where expected
    #[error("Expected build output missing: '{path}'")]
    MissingOutput { path: PathBuf },

    /// Filesystem error inside the workspace
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Install bundle composition errors
#[derive(Error, Debug)]
pub enum ComposeError {
    /// Shared asset required by the bundle was never produced
    #[error("Shared asset '{name}' was not produced this run")]
    MissingAsset { name: String },

    /// Extra file to copy into the bundle is missing
    #[error("Extra file '{path}' not found in the source tree")]
    MissingExtra { path: PathBuf },

    /// Archiving the composition directory failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Filesystem error while composing
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Release publishing errors (fatal to the run)
#[derive(Error, Debug)]
pub enum PublishError {
    /// Copying an archive into the revision store failed
    #[error("Failed to copy '{archive}' into '{dest}': {error}")]
    CopyFailed {
        archive: PathBuf,
        dest: PathBuf,
        error: String,
    },

    /// Creating an alias (symlink) failed
    #[error("Failed to create alias '{path}': {error}")]
    AliasFailed { path: PathBuf, error: String },

    /// Filesystem error under the release root
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to copy a file or tree
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to read a directory
    #[error("Failed to read directory '{path}': {error}")]
    ReadDir { path: PathBuf, error: String },
}
