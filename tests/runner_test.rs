//! Integration tests for the per-target build pipeline

mod common;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use common::TestProject;
use nightbuild::core::archive::ArchiveFormat;
use nightbuild::core::manifest::{AssetSpec, BuildSettings, TargetSpec};
use nightbuild::core::runner::TargetRunner;

fn target_spec(os: &str, compiler: &str) -> TargetSpec {
    TargetSpec {
        os: os.to_string(),
        compiler: compiler.to_string(),
        toolchain: None,
        binary: "game".to_string(),
        binary_dir: "src/engine".to_string(),
        extern_url: None,
        extern_format: None,
        extern_libs: None,
        env: HashMap::new(),
        defines: BTreeMap::new(),
        builds_asset: false,
    }
}

fn build_settings(program: &PathBuf) -> BuildSettings {
    BuildSettings {
        program: program.display().to_string(),
        target: "game".to_string(),
        config: "Release".to_string(),
    }
}

fn runner(
    project: &TestProject,
    spec: TargetSpec,
    asset: Option<AssetSpec>,
    stub: &PathBuf,
) -> TargetRunner {
    TargetRunner::new(
        spec,
        build_settings(stub),
        asset,
        project.path().join("nightly"),
        project.create_source_tree(),
        2,
    )
}

#[tokio::test]
async fn test_successful_pipeline_populates_package() {
    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");

    let r = runner(&project, target_spec("linux64", "gcc"), None, &stub);
    let status = r.status();
    r.run().await;

    assert_eq!(status.outcome(), Some(true));
    assert_eq!(status.progress(), 100);
    assert!(project.file_exists("nightly/linux64-gcc/package/game"));
    let log = project.read_file("nightly/linux64-gcc/build.log");
    assert!(log.contains("Building C object"));
}

#[tokio::test]
async fn test_build_failure_removes_package_dir() {
    let project = TestProject::new();
    let stub = project.create_build_stub("linux32-gcc");

    let r = runner(&project, target_spec("linux32", "gcc"), None, &stub);
    let status = r.status();
    r.run().await;

    assert_eq!(status.outcome(), Some(false));
    assert!(!project.file_exists("nightly/linux32-gcc/package"));
    // The log survives for diagnosis
    let log = project.read_file("nightly/linux32-gcc/build.log");
    assert!(log.contains("compilation failed"));
}

#[tokio::test]
async fn test_missing_binary_is_a_failure() {
    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");

    let mut spec = target_spec("linux64", "gcc");
    spec.binary = "not-produced".to_string();
    let r = runner(&project, spec, None, &stub);
    let status = r.status();
    r.run().await;

    assert_eq!(status.outcome(), Some(false));
    assert!(!project.file_exists("nightly/linux64-gcc/package"));
}

#[tokio::test]
async fn test_asset_producer_copies_to_shared_location() {
    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");

    let mut spec = target_spec("win32", "mingw");
    spec.builds_asset = true;
    let asset = AssetSpec {
        name: "kex.wad".to_string(),
        target: "wad".to_string(),
        path: "data/kex.wad".to_string(),
    };

    let r = runner(&project, spec, Some(asset), &stub);
    let status = r.status();
    r.run().await;

    assert_eq!(status.outcome(), Some(true));
    assert!(project.file_exists("nightly/kex.wad"));
    assert!(project.file_exists("nightly/win32-mingw/package/game"));
}

#[tokio::test]
async fn test_non_producer_skips_asset_step() {
    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");

    let spec = target_spec("linux64", "gcc");
    let asset = AssetSpec {
        name: "kex.wad".to_string(),
        target: "wad".to_string(),
        path: "data/kex.wad".to_string(),
    };

    let r = runner(&project, spec, Some(asset), &stub);
    r.run().await;

    assert!(!project.file_exists("nightly/kex.wad"));
}

#[tokio::test]
async fn test_extern_archive_fetched_and_libs_packaged() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let project = TestProject::new();
    let stub = project.create_build_stub("never-matches");

    // Build a small dependency tarball with one runtime library
    project.create_file("deps/lib/libSDL2.so", "so bytes");
    let tarball = project.path().join("deps.tar.gz");
    let status = std::process::Command::new("tar")
        .args(["-czf"])
        .arg(&tarball)
        .args(["-C"])
        .arg(project.path().join("deps"))
        .arg(".")
        .status()
        .expect("tar available");
    assert!(status.success());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/deps.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(std::fs::read(&tarball).unwrap()))
        .mount(&server)
        .await;

    let mut spec = target_spec("win32", "mingw");
    spec.extern_url = Some(format!("{}/deps.tar.gz", server.uri()));
    spec.extern_format = Some(ArchiveFormat::TarGz);
    spec.extern_libs = Some("lib/*.so".to_string());

    let r = runner(&project, spec, None, &stub);
    let status = r.status();
    r.run().await;

    assert_eq!(status.outcome(), Some(true));
    assert!(project.file_exists("nightly/win32-mingw/package/libSDL2.so"));
    assert!(project.file_exists("nightly/win32-mingw/package/game"));
}
