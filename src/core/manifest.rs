//! Manifest (nightbuild.toml) parsing and validation
//!
//! The manifest declares the immutable run configuration: where the
//! source tree comes from, the target platform/compiler configurations
//! to build, the shared auxiliary asset, and the install bundles to
//! compose from completed targets.
//!
//! Archive formats are resolved from file extensions exactly once, here,
//! and carried as [`ArchiveFormat`] values afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::defaults;
use crate::core::archive::ArchiveFormat;
use crate::error::ManifestError;
use crate::infra::source::SourceSpec;

/// One target platform/compiler build configuration
#[derive(Debug, Clone)]
pub struct TargetSpec {
    /// Operating-system id, unique per manifest (e.g. "win32", "linux64")
    pub os: String,
    /// Compiler id (e.g. "gcc", "mingw")
    pub compiler: String,
    /// Cross-compilation toolchain file, relative to the source tree
    pub toolchain: Option<String>,
    /// Name of the produced binary (e.g. "doom64ex.exe")
    pub binary: String,
    /// Subdirectory of the build tree that holds the binary
    pub binary_dir: String,
    /// URL of a dependency archive to fetch and unpack before building
    pub extern_url: Option<String>,
    /// Archive format of `extern_url`, None when its extension is unsupported
    pub extern_format: Option<ArchiveFormat>,
    /// Glob (relative to the unpacked dependency archive) selecting
    /// runtime libraries to bundle next to the binary
    pub extern_libs: Option<String>,
    /// Environment variable overrides for the generate step
    pub env: HashMap<String, String>,
    /// Build-system define overrides (-D<K>=<V>)
    pub defines: BTreeMap<String, String>,
    /// Whether this target also produces the shared auxiliary asset
    pub builds_asset: bool,
}

impl TargetSpec {
    /// Per-target workspace directory name, `<os>-<compiler>`
    pub fn workspace_name(&self) -> String {
        format!("{}-{}", self.os, self.compiler)
    }
}

/// The shared auxiliary asset, produced once per run
#[derive(Debug, Clone, Deserialize)]
pub struct AssetSpec {
    /// File name of the asset (also its name under the build root)
    pub name: String,
    /// Build-system target that produces it
    pub target: String,
    /// Path of the produced file, relative to the build tree
    pub path: String,
}

/// A named distributable bundle composed from completed targets
#[derive(Debug, Clone)]
pub struct InstallSpec {
    /// Bundle archive file name; its extension declared the format
    pub archive: String,
    /// Resolved archive format, None when the extension is unsupported
    /// (composing such a bundle fails without touching the filesystem)
    pub format: Option<ArchiveFormat>,
    /// Required target os-id mapped to its destination subdirectory
    /// inside the bundle ("/" for the bundle root)
    pub layout: BTreeMap<String, String>,
    /// Destination of the shared auxiliary asset inside the bundle
    pub asset_dest: Option<String>,
    /// Extra static files: destination inside the bundle mapped to a
    /// source-tree relative path
    pub extra: BTreeMap<String, String>,
}

impl InstallSpec {
    /// Bundle name without the archive extension, used for scratch dirs
    pub fn stem(&self) -> String {
        ArchiveFormat::stem(&self.archive).unwrap_or_else(|_| self.archive.clone())
    }
}

/// Build-system settings
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Build-system program (default "cmake"; overridable for testing)
    pub program: String,
    /// Build-system target producing the application binary
    pub target: String,
    /// Build configuration (default "Release")
    pub config: String,
}

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Project name
    pub name: String,
    /// Where the source tree comes from
    pub source: SourceSpec,
    /// Build-system settings
    pub build: BuildSettings,
    /// Shared auxiliary asset, if any target produces one
    pub asset: Option<AssetSpec>,
    /// Declared targets
    pub targets: Vec<TargetSpec>,
    /// Declared install bundles
    pub installs: Vec<InstallSpec>,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate manifest TOML
    pub fn from_toml(content: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(content)?;
        raw.validate()
    }

    /// Look up a declared target by its os id
    pub fn target(&self, os: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.os == os)
    }
}

// Raw deserialization mirror; `RawManifest::validate` produces the
// public, resolved `Manifest`.

#[derive(Debug, Deserialize)]
struct RawManifest {
    project: RawProject,
    source: RawSource,
    #[serde(default)]
    build: RawBuild,
    asset: Option<AssetSpec>,
    #[serde(rename = "target", default)]
    targets: Vec<RawTarget>,
    #[serde(rename = "install", default)]
    installs: Vec<RawInstall>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    repo: Option<String>,
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBuild {
    program: Option<String>,
    target: Option<String>,
    config: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    os: String,
    compiler: String,
    toolchain: Option<String>,
    binary: String,
    #[serde(default)]
    binary_dir: String,
    #[serde(rename = "extern")]
    extern_url: Option<String>,
    extern_libs: Option<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    defines: BTreeMap<String, String>,
    #[serde(default)]
    builds_asset: bool,
}

#[derive(Debug, Deserialize)]
struct RawInstall {
    archive: String,
    asset_dest: Option<String>,
    #[serde(default)]
    layout: BTreeMap<String, String>,
    #[serde(default)]
    extra: BTreeMap<String, String>,
}

impl RawManifest {
    fn validate(self) -> Result<Manifest, ManifestError> {
        if self.targets.is_empty() {
            return Err(ManifestError::NoTargets);
        }

        let source = match (self.source.repo, self.source.path) {
            (_, Some(path)) => SourceSpec::Local { path },
            (Some(url), None) => SourceSpec::Repo { url },
            (None, None) => return Err(ManifestError::NoSource),
        };

        let mut targets = Vec::with_capacity(self.targets.len());
        let mut producer: Option<String> = None;
        for raw in self.targets {
            if targets.iter().any(|t: &TargetSpec| t.os == raw.os) {
                return Err(ManifestError::DuplicateTarget { os: raw.os });
            }
            if raw.builds_asset {
                if let Some(first) = &producer {
                    return Err(ManifestError::MultipleAssetProducers {
                        first: first.clone(),
                        second: raw.os,
                    });
                }
                if self.asset.is_none() {
                    return Err(ManifestError::AssetNotDeclared { os: raw.os });
                }
                producer = Some(raw.os.clone());
            }

            let extern_format = raw
                .extern_url
                .as_deref()
                .and_then(|url| ArchiveFormat::from_name(url).ok());
            targets.push(TargetSpec {
                os: raw.os,
                compiler: raw.compiler,
                toolchain: raw.toolchain,
                binary: raw.binary,
                binary_dir: raw.binary_dir,
                extern_url: raw.extern_url,
                extern_format,
                extern_libs: raw.extern_libs,
                env: raw.env,
                defines: raw.defines,
                builds_asset: raw.builds_asset,
            });
        }

        let mut installs = Vec::with_capacity(self.installs.len());
        for raw in self.installs {
            for os in raw.layout.keys() {
                if !targets.iter().any(|t| &t.os == os) {
                    return Err(ManifestError::UnknownTarget {
                        archive: raw.archive,
                        os: os.clone(),
                    });
                }
            }
            let format = match ArchiveFormat::from_name(&raw.archive) {
                Ok(f) => Some(f),
                Err(e) => {
                    tracing::warn!("Install bundle '{}' will be skipped: {e}", raw.archive);
                    None
                }
            };
            installs.push(InstallSpec {
                archive: raw.archive,
                format,
                layout: raw.layout,
                asset_dest: raw.asset_dest,
                extra: raw.extra,
            });
        }

        let name = self.project.name;
        let build = BuildSettings {
            program: self
                .build
                .program
                .unwrap_or_else(|| defaults::BUILD_PROGRAM.to_string()),
            target: self.build.target.unwrap_or_else(|| name.clone()),
            config: self
                .build
                .config
                .unwrap_or_else(|| defaults::BUILD_CONFIG.to_string()),
        };

        Ok(Manifest {
            name,
            source,
            build,
            asset: self.asset,
            targets,
            installs,
        })
    }
}
