//! End-to-end tests over the full build-compose-publish run

mod common;

use std::path::Path;

use common::TestProject;
use nightbuild::core::manifest::Manifest;
use nightbuild::core::orchestrator::{self, BundleOutcome, RunOptions};

fn manifest_toml(project: &TestProject, stub: &Path) -> String {
    format!(
        r#"
[project]
name = "game"

[source]
path = "{source}"

[build]
program = "{stub}"
target = "game"

[asset]
name = "kex.wad"
target = "wad"
path = "data/kex.wad"

[[target]]
os = "win32"
compiler = "mingw"
binary = "game"
binary_dir = "src/engine"
builds_asset = true

[[target]]
os = "linux32"
compiler = "gcc"
binary = "game"
binary_dir = "src/engine"

[[target]]
os = "linux64"
compiler = "gcc"
binary = "game"
binary_dir = "src/engine"

[[install]]
archive = "game-win32.tar.gz"
asset_dest = "/"

[install.layout]
win32 = "/"

[[install]]
archive = "game-linux.tar.gz"
asset_dest = "/"

[install.layout]
linux32 = "/linux32"
linux64 = "/linux64"

[install.extra]
"start.sh" = "script/start.sh"
"#,
        source = project.create_source_tree().display(),
        stub = stub.display(),
    )
}

fn options(project: &TestProject, only: Option<&str>) -> RunOptions {
    RunOptions {
        only_target: only.map(ToString::to_string),
        build_root: project.path().join("nightly"),
        release_root: project.path().join("releases"),
        jobs: 2,
    }
}

fn archive_listing(archive: &Path) -> String {
    let out = std::process::Command::new("tar")
        .arg("-tzf")
        .arg(archive)
        .output()
        .expect("tar available");
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap()
}

#[tokio::test]
async fn test_full_run_publishes_all_bundles() {
    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");
    let manifest = Manifest::from_toml(&manifest_toml(&project, &stub)).unwrap();

    let report = orchestrator::run(&manifest, &options(&project, None))
        .await
        .unwrap();

    assert!(report.targets.iter().all(|t| t.succeeded));
    assert!(report
        .bundles
        .iter()
        .all(|b| matches!(b.outcome, BundleOutcome::Archived(_))));

    // Workspaces for every declared target
    assert!(project.file_exists("nightly/win32-mingw/package/game"));
    assert!(project.file_exists("nightly/linux32-gcc/package/game"));
    assert!(project.file_exists("nightly/linux64-gcc/package/game"));

    // Both archives landed in the revision store and latest points there
    let rev_dir = project
        .path()
        .join("releases/by-commit")
        .join(&report.revision);
    assert!(rev_dir.join("game-win32.tar.gz").exists());
    assert!(rev_dir.join("game-linux.tar.gz").exists());
    assert_eq!(
        project.path().join("releases/latest").canonicalize().unwrap(),
        rev_dir.canonicalize().unwrap()
    );

    // The multi-target bundle carries both builds, the shared asset,
    // and the extra static file at their declared destinations
    let listing = archive_listing(&rev_dir.join("game-linux.tar.gz"));
    assert!(listing.contains("linux32/game"));
    assert!(listing.contains("linux64/game"));
    assert!(listing.contains("kex.wad"));
    assert!(listing.contains("start.sh"));
}

#[tokio::test]
async fn test_failed_target_skips_dependent_bundle_only() {
    let project = TestProject::new();
    let stub = project.create_build_stub("linux32-gcc");
    let manifest = Manifest::from_toml(&manifest_toml(&project, &stub)).unwrap();

    let report = orchestrator::run(&manifest, &options(&project, None))
        .await
        .unwrap();

    // The failed target is terminal and isolated
    let linux32 = report.targets.iter().find(|t| t.os == "linux32").unwrap();
    assert!(!linux32.succeeded);
    assert!(report
        .targets
        .iter()
        .filter(|t| t.os != "linux32")
        .all(|t| t.succeeded));
    assert!(!project.file_exists("nightly/linux32-gcc/package"));

    // Its bundle is skipped, the independent one still ships
    let linux_bundle = report
        .bundles
        .iter()
        .find(|b| b.archive == "game-linux.tar.gz")
        .unwrap();
    match &linux_bundle.outcome {
        BundleOutcome::Skipped(missing) => assert_eq!(missing, &vec!["linux32".to_string()]),
        other => panic!("expected skip, got {other:?}"),
    }
    assert!(!project.file_exists("nightly/install-game-linux"));

    let rev_dir = project
        .path()
        .join("releases/by-commit")
        .join(&report.revision);
    assert!(rev_dir.join("game-win32.tar.gz").exists());
    assert!(!rev_dir.join("game-linux.tar.gz").exists());
}

#[tokio::test]
async fn test_subset_selection_builds_only_that_target() {
    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");
    let manifest = Manifest::from_toml(&manifest_toml(&project, &stub)).unwrap();

    // Neither bundle's prerequisites are satisfiable from this subset,
    // so the run fails at the publish gate
    let err = orchestrator::run(&manifest, &options(&project, Some("linux64")))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No install bundles"));

    assert!(project.file_exists("nightly/linux64-gcc/package/game"));
    assert!(!project.file_exists("nightly/win32-mingw"));
    assert!(!project.file_exists("nightly/linux32-gcc"));
    assert!(!project.file_exists("releases/latest"));
}

#[tokio::test]
async fn test_unknown_target_selection_is_fatal_before_any_work() {
    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");
    let manifest = Manifest::from_toml(&manifest_toml(&project, &stub)).unwrap();

    let err = orchestrator::run(&manifest, &options(&project, Some("beos")))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("beos"));
    assert!(!project.file_exists("nightly"));
}
