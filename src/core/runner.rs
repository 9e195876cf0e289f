//! Target build pipeline
//!
//! One [`TargetRunner`] executes a single target's full pipeline in an
//! isolated workspace: source copy, optional dependency-archive fetch
//! and unpack, build-system generate and build steps, artifact
//! collection, and (for the flagged producer) the shared auxiliary
//! asset. All subprocess output is appended to the target's build log;
//! progress percentages scanned from that output are published through
//! the target's [`TargetStatus`].
//!
//! Every failure is terminal for the target and invisible to sibling
//! runners. The package directory is left populated only when the whole
//! pipeline succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::defaults;
use crate::core::manifest::{AssetSpec, BuildSettings, TargetSpec};
use crate::core::status::TargetStatus;
use crate::error::{ArchiveError, RunnerError};
use crate::infra::download::Fetcher;
use crate::infra::filesystem;
use crate::infra::process::{self, CommandSpec, ProcessError, ProgressCallback};

/// Runs one target's build pipeline in its own workspace
pub struct TargetRunner {
    spec: TargetSpec,
    build: BuildSettings,
    asset: Option<AssetSpec>,
    /// `<build-root>/<os>-<compiler>`
    workspace: PathBuf,
    /// Run-wide shared location for the auxiliary asset
    build_root: PathBuf,
    /// Checked-out source tree to copy from
    source_tree: PathBuf,
    jobs: usize,
    status: Arc<TargetStatus>,
}

impl TargetRunner {
    pub fn new(
        spec: TargetSpec,
        build: BuildSettings,
        asset: Option<AssetSpec>,
        build_root: PathBuf,
        source_tree: PathBuf,
        jobs: usize,
    ) -> Self {
        let workspace = build_root.join(spec.workspace_name());
        let status = Arc::new(TargetStatus::new(workspace.join(defaults::BUILD_LOG_FILE)));
        Self {
            spec,
            build,
            asset,
            workspace,
            build_root,
            source_tree,
            jobs,
            status,
        }
    }

    /// Shared status record, readable while the pipeline runs
    pub fn status(&self) -> Arc<TargetStatus> {
        self.status.clone()
    }

    /// Target os id this runner builds
    pub fn os(&self) -> &str {
        &self.spec.os
    }

    /// Per-target package directory populated on success
    pub fn package_dir(&self) -> PathBuf {
        self.workspace.join("package")
    }

    /// Execute the pipeline to its terminal state
    ///
    /// Never returns an error to the caller: failures are recorded in
    /// the status and the log, and must not disturb sibling runners.
    pub async fn run(self) {
        let os = self.spec.os.clone();
        match self.pipeline().await {
            Ok(()) => {
                tracing::info!("Target {os} built successfully");
                self.status.finish(true);
            }
            Err(e) => {
                tracing::warn!("Target {os} failed: {e}");
                // A populated package dir is the success signal; never
                // leave one behind for a failed pipeline.
                let _ = filesystem::remove_dir_all(&self.package_dir());
                self.status.finish(false);
            }
        }
    }

    async fn pipeline(&self) -> Result<(), RunnerError> {
        let source = self.workspace.join("source");
        let build = self.workspace.join("build");
        let package = self.package_dir();

        filesystem::create_dir_all(&build)?;
        filesystem::create_dir_all(&package)?;

        let mut log = tokio::fs::File::create(self.status.log_path())
            .await
            .map_err(|e| step_spawn("log", &e.to_string()))?;

        filesystem::copy_dir_all(&self.source_tree, &source)?;

        if self.spec.extern_url.is_some() {
            self.fetch_extern(&source, &mut log).await?;
        }

        let progress = self.progress_callback();

        process::run_logged(&self.generate_command(&source, &build), &mut log, Some(&progress))
            .await
            .map_err(|e| step_err("generate", e))?;

        process::run_logged(
            &self.build_command(&build, &self.build.target),
            &mut log,
            Some(&progress),
        )
        .await
        .map_err(|e| step_err("build", e))?;

        self.collect_artifacts(&source, &build, &package)?;

        if let Some(asset) = self.asset.as_ref().filter(|_| self.spec.builds_asset) {
            self.build_asset(asset, &build, &mut log, &progress).await?;
        }

        Ok(())
    }

    /// Fetch the dependency archive and unpack it into `source/extern`
    async fn fetch_extern(
        &self,
        source: &Path,
        log: &mut tokio::fs::File,
    ) -> Result<(), RunnerError> {
        let url = self.spec.extern_url.as_deref().unwrap_or_default();
        // Resolved at manifest load; None means the URL's extension is
        // not a supported archive format, which is a configuration error.
        let format = self
            .spec
            .extern_format
            .ok_or_else(|| ArchiveError::UnrecognizedFormat {
                name: url.to_string(),
            })?;

        let archive_path = source.join(format!("extern{}", format.extension()));
        let result = Fetcher::new().fetch(url, &archive_path).await?;

        use tokio::io::AsyncWriteExt;
        let note = format!(
            "fetched {url} ({} bytes, sha256 {})\n",
            result.size, result.checksum
        );
        let _ = log.write_all(note.as_bytes()).await;

        let extern_dir = source.join("extern");
        filesystem::create_dir_all(&extern_dir)?;
        process::run_logged(&format.extract_command(&archive_path, &extern_dir), log, None)
            .await
            .map_err(|e| step_err("unpack", e))?;
        Ok(())
    }

    /// Generate step: configure the build tree
    ///
    /// Environment overrides apply here; compilers read CFLAGS and
    /// friends at configure time and the build step reuses the cached
    /// values.
    fn generate_command(&self, source: &Path, build: &Path) -> CommandSpec {
        let mut args = vec![
            "-S".to_string(),
            source.display().to_string(),
            "-B".to_string(),
            build.display().to_string(),
        ];
        if let Some(ref toolchain) = self.spec.toolchain {
            args.push(format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                source.join(toolchain).display()
            ));
        }
        for (key, value) in &self.spec.defines {
            args.push(format!("-D{key}={value}"));
        }
        CommandSpec::new(&self.build.program, args).with_env(self.spec.env.clone())
    }

    /// Build step for a named build-system target
    fn build_command(&self, build: &Path, target: &str) -> CommandSpec {
        CommandSpec::new(
            &self.build.program,
            [
                "--build".to_string(),
                build.display().to_string(),
                "--target".to_string(),
                target.to_string(),
                "--config".to_string(),
                self.build.config.clone(),
                "--".to_string(),
                format!("-j{}", self.jobs),
            ],
        )
    }

    /// Copy the produced binary and any declared runtime libraries into
    /// the package directory
    fn collect_artifacts(
        &self,
        source: &Path,
        build: &Path,
        package: &Path,
    ) -> Result<(), RunnerError> {
        let binary = if self.spec.binary_dir.is_empty() {
            build.join(&self.spec.binary)
        } else {
            build.join(&self.spec.binary_dir).join(&self.spec.binary)
        };
        if !binary.is_file() {
            return Err(RunnerError::MissingOutput { path: binary });
        }
        filesystem::copy_file(&binary, &package.join(&self.spec.binary))?;

        if let Some(ref pattern) = self.spec.extern_libs {
            let extern_dir = source.join("extern");
            for lib in filesystem::glob_files(&extern_dir, pattern)? {
                let name = lib.file_name().unwrap_or_default();
                filesystem::copy_file(&lib, &package.join(name))?;
            }
        }
        Ok(())
    }

    /// Build the shared auxiliary asset and copy it to the run-wide
    /// shared location under the build root
    async fn build_asset(
        &self,
        asset: &AssetSpec,
        build: &Path,
        log: &mut tokio::fs::File,
        progress: &ProgressCallback,
    ) -> Result<(), RunnerError> {
        process::run_logged(&self.build_command(build, &asset.target), log, Some(progress))
            .await
            .map_err(|e| step_err("asset", e))?;

        let produced = build.join(&asset.path);
        if !produced.is_file() {
            return Err(RunnerError::MissingOutput { path: produced });
        }
        filesystem::copy_file(&produced, &self.build_root.join(&asset.name))?;
        Ok(())
    }

    fn progress_callback(&self) -> ProgressCallback {
        let status = self.status.clone();
        Box::new(move |percent| status.set_progress(percent))
    }
}

fn step_err(step: &str, e: ProcessError) -> RunnerError {
    match e {
        ProcessError::NonZeroExit { status, .. } => RunnerError::StepFailed {
            step: step.to_string(),
            status,
        },
        ProcessError::Spawn { error, .. } | ProcessError::Io { error, .. } => {
            step_spawn(step, &error)
        }
    }
}

fn step_spawn(step: &str, error: &str) -> RunnerError {
    RunnerError::StepSpawn {
        step: step.to_string(),
        error: error.to_string(),
    }
}
