use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use wsorch_core::staleness::{newest_file, StalenessDetector, SUCCESSFUL_BUILD};

fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn create_built_package(dir: &Path) -> SystemTime {
    let past = SystemTime::now() - Duration::from_secs(3600);
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::create_dir_all(dir.join("dist")).unwrap();
    fs::write(dir.join("package.json"), r#"{"name": "pkg", "version": "1.0.0"}"#).unwrap();
    fs::write(dir.join("src").join("index.ts"), "export {}").unwrap();
    fs::write(dir.join("dist").join("index.js"), "exports = {}").unwrap();
    for file in ["package.json", "src/index.ts", "dist/index.js"] {
        set_mtime(&dir.join(file), past);
    }
    past
}

#[test]
fn test_needs_build_without_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    fs::create_dir_all(pkg.join("src")).unwrap();
    fs::write(pkg.join("src").join("index.ts"), "export {}").unwrap();

    let detector = StalenessDetector::default();
    assert!(detector.needs_build(&pkg));

    detector.mark_built(&pkg).unwrap();
    assert!(detector.needs_build(&pkg), "marker alone does not count without dist/");
}

#[test]
fn test_needs_build_for_missing_package_dir() {
    let temp_dir = TempDir::new().unwrap();
    let detector = StalenessDetector::default();
    assert!(detector.needs_build(&temp_dir.path().join("does-not-exist")));
}

#[test]
fn test_needs_build_without_marker() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    create_built_package(&pkg);

    let detector = StalenessDetector::default();
    assert!(detector.needs_build(&pkg));
}

#[test]
fn test_fresh_when_marker_is_newest() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    create_built_package(&pkg);

    let detector = StalenessDetector::default();
    detector.mark_built(&pkg).unwrap();

    assert!(!detector.needs_build(&pkg));
    assert_eq!(newest_file(&pkg), Some(pkg.join(SUCCESSFUL_BUILD)));
}

#[test]
fn test_touching_source_after_marker_makes_stale() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    create_built_package(&pkg);

    let detector = StalenessDetector::default();
    detector.mark_built(&pkg).unwrap();
    assert!(!detector.needs_build(&pkg));

    let later = SystemTime::now() + Duration::from_secs(10);
    set_mtime(&pkg.join("src").join("index.ts"), later);

    assert!(detector.needs_build(&pkg));
    assert_eq!(newest_file(&pkg), Some(pkg.join("src").join("index.ts")));
}

#[test]
fn test_failed_build_leaves_package_stale() {
    // A build that fails after touching files never reaches mark_built, so the
    // marker from the previous success is older than what the build wrote.
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    create_built_package(&pkg);

    let detector = StalenessDetector::default();
    detector.mark_built(&pkg).unwrap();
    set_mtime(&pkg.join(SUCCESSFUL_BUILD), SystemTime::now() - Duration::from_secs(60));

    fs::write(pkg.join("dist").join("partial.js"), "half written").unwrap();

    assert!(detector.needs_build(&pkg));
}

#[test]
fn test_nested_file_newer_than_marker() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    create_built_package(&pkg);

    let detector = StalenessDetector::default();
    detector.mark_built(&pkg).unwrap();

    let deep = pkg.join("src").join("a").join("b");
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("deep.ts"), "export const x = 1").unwrap();
    set_mtime(&deep.join("deep.ts"), SystemTime::now() + Duration::from_secs(10));

    assert!(detector.needs_build(&pkg));
}

#[test]
fn test_timestamp_tie_is_resolved_by_listing_order() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    create_built_package(&pkg);

    let detector = StalenessDetector::default();
    detector.mark_built(&pkg).unwrap();

    let same = SystemTime::now() - Duration::from_secs(5);
    for file in [SUCCESSFUL_BUILD, "package.json", "src/index.ts", "dist/index.js"] {
        set_mtime(&pkg.join(file), same);
    }

    // The marker sorts first among the package root entries.
    assert_eq!(newest_file(&pkg), Some(pkg.join(SUCCESSFUL_BUILD)));
    assert!(!detector.needs_build(&pkg));
}

#[test]
fn test_custom_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    fs::create_dir_all(pkg.join("build")).unwrap();
    fs::write(pkg.join("build").join("out.js"), "").unwrap();
    set_mtime(&pkg.join("build").join("out.js"), SystemTime::now() - Duration::from_secs(60));

    let detector = StalenessDetector::new("build");
    detector.mark_built(&pkg).unwrap();
    assert!(!detector.needs_build(&pkg));
    assert!(StalenessDetector::default().needs_build(&pkg));
}

#[test]
fn test_newest_file_of_empty_dir() {
    let temp_dir = TempDir::new().unwrap();
    assert_eq!(newest_file(temp_dir.path()), None);
}
