//! Default configuration values

/// Manifest file name looked up in the working directory
pub const MANIFEST_FILE: &str = "nightbuild.toml";

/// Progress monitor poll interval in milliseconds
pub const MONITOR_POLL_MS: u64 = 1000;

/// Per-target build log file name inside the workspace
pub const BUILD_LOG_FILE: &str = "build.log";

/// Subdirectory of the release root keyed by source revision
pub const BY_COMMIT_DIR: &str = "by-commit";

/// Subdirectory of the release root keyed by publish timestamp
pub const BY_DATE_DIR: &str = "by-date";

/// Floating alias to the most recently published revision
pub const LATEST_LINK: &str = "latest";

/// Default build root when `--build-root` is not given
pub const BUILD_ROOT: &str = "nightly";

/// Default release root when `--release-root` is not given
pub const RELEASE_ROOT: &str = "releases";

/// Default build-system program
pub const BUILD_PROGRAM: &str = "cmake";

/// Default build configuration passed to the build step
pub const BUILD_CONFIG: &str = "Release";
