use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use wsorch_core::config::WorkspaceConfig;
use wsorch_core::package::{Package, Selection};
use wsorch_core::registry::{filter_packages, PackageRegistry};

fn create_test_package(root: &Path, rel: &str) {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("package.json"),
        format!(r#"{{"name": "@test/{}", "version": "1.0.0"}}"#, rel.replace('/', "-")),
    )
    .unwrap();
}

fn config_with_order(order: &[&str]) -> WorkspaceConfig {
    WorkspaceConfig {
        order: order.iter().map(|s| s.to_string()).collect(),
        ..WorkspaceConfig::default()
    }
}

fn paths(packages: &[Package]) -> Vec<PathBuf> {
    packages.iter().map(|p| p.path.clone()).collect()
}

fn packages(names: &[&str]) -> Vec<Package> {
    names
        .iter()
        .map(|n| Package::new(format!("packages/{}", n)))
        .collect()
}

#[test]
fn test_listed_order_then_discovered() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    create_test_package(root, "packages");
    for name in ["zeta", "alpha", "util", "beta"] {
        create_test_package(root, &format!("packages/{}", name));
    }
    // Directory without a manifest is not a package.
    fs::create_dir_all(root.join("packages").join("docs")).unwrap();

    let config = config_with_order(&[
        "packages/",
        "packages/util",
        "packages/zeta",
        "packages/missing",
    ]);
    let registry = PackageRegistry::new(root, &config);
    let listed = registry.list_packages().unwrap();

    assert_eq!(
        paths(&listed),
        vec![
            PathBuf::from("packages/"),
            PathBuf::from("packages/util"),
            PathBuf::from("packages/zeta"),
            PathBuf::from("packages/alpha"),
            PathBuf::from("packages/beta"),
        ]
    );
}

#[test]
fn test_listing_without_packages_dir() {
    let temp_dir = TempDir::new().unwrap();
    let registry = PackageRegistry::new(temp_dir.path(), &config_with_order(&[]));
    assert!(registry.list_packages().unwrap().is_empty());
}

#[test]
fn test_custom_packages_dir() {
    let temp_dir = TempDir::new().unwrap();
    create_test_package(temp_dir.path(), "libs/core");
    create_test_package(temp_dir.path(), "packages/ignored");

    let config = WorkspaceConfig {
        packages_dir: "libs".to_string(),
        order: Vec::new(),
        ..WorkspaceConfig::default()
    };
    let registry = PackageRegistry::new(temp_dir.path(), &config);

    assert_eq!(
        paths(&registry.list_packages().unwrap()),
        vec![PathBuf::from("libs/core")]
    );
}

#[test]
fn test_include_filter() {
    let all = packages(&["a", "b", "c", "d"]);
    let kept = filter_packages(all, &Selection::new(["a", "c"], Vec::<String>::new()));
    assert_eq!(kept, packages(&["a", "c"]));
}

#[test]
fn test_exclude_filter_without_include() {
    let all = packages(&["a", "b", "c", "d"]);
    let kept = filter_packages(all, &Selection::new(Vec::<String>::new(), ["b"]));
    assert_eq!(kept, packages(&["a", "c", "d"]));
}

#[test]
fn test_include_then_exclude() {
    let all = packages(&["a", "b", "c", "d"]);
    let kept = filter_packages(all, &Selection::new(["a", "b"], ["b"]));
    assert_eq!(kept, packages(&["a"]));
}

#[test]
fn test_unknown_names_select_nothing() {
    let all = packages(&["a", "b"]);
    let kept = filter_packages(all, &Selection::new(["nope"], Vec::<String>::new()));
    assert!(kept.is_empty());
}

#[test]
fn test_selection_from_lists() {
    let selection = Selection::from_lists("util, server,,", "");
    assert_eq!(selection.include.len(), 2);
    assert!(selection.include.contains("util"));
    assert!(selection.include.contains("server"));
    assert!(selection.exclude.is_empty());
    assert_eq!(Selection::from_lists("", ""), Selection::all());
}

#[test]
fn test_short_name() {
    assert_eq!(Package::new("packages/util").short_name(), "util");
    assert_eq!(Package::new("packages/").short_name(), "packages");
}

#[test]
fn test_select_through_registry() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        create_test_package(temp_dir.path(), &format!("packages/{}", name));
    }
    let registry = PackageRegistry::new(temp_dir.path(), &config_with_order(&["packages/c"]));

    let selected = registry.select(&Selection::new(Vec::<String>::new(), ["b"])).unwrap();
    assert_eq!(selected, packages(&["c", "a"]));
}
