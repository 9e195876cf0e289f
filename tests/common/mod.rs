//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory holding a fake source tree, a stub
/// build program, and the build/release roots a run writes into.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Write an executable shell script and return its absolute path
    pub fn create_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).expect("Failed to write script");
        let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod script");
        path
    }

    /// Create a minimal source tree with a marker file and a start script
    pub fn create_source_tree(&self) -> PathBuf {
        self.create_file("project/CMakeLists.txt", "project(game)\n");
        self.create_file("project/script/start.sh", "#!/bin/sh\n./game\n");
        self.dir.path().join("project")
    }

    /// Stub build program covering generate, build, and asset steps
    ///
    /// Mimics the output of a real build tool: emits percent tokens,
    /// creates `src/engine/game` (or `data/kex.wad` for the `wad`
    /// target) under the build directory, and fails for any workspace
    /// whose path contains the marker passed in `fail_on`.
    pub fn create_build_stub(&self, fail_on: &str) -> PathBuf {
        let body = format!(
            r#"#!/bin/sh
if [ "$1" = "-S" ]; then
    exit 0
fi
if [ "$1" != "--build" ]; then
    exit 2
fi
builddir="$2"
target="$4"
echo "[ 10%] Building C object"
echo "[ 55%] Building C object"
echo "[100%] Linking"
case "$builddir" in
    *{fail_on}*) echo "error: compilation failed" >&2; exit 1 ;;
esac
if [ "$target" = "wad" ]; then
    mkdir -p "$builddir/data"
    echo "wad bytes" > "$builddir/data/kex.wad"
else
    mkdir -p "$builddir/src/engine"
    echo "binary for $target" > "$builddir/src/engine/game"
fi
exit 0
"#
        );
        self.create_script("fake-build", &body)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
