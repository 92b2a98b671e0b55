use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use wsorch_core::config::{WorkspaceConfig, CONFIG_FILE, DEFAULT_ORDER};
use wsorch_core::error::Error;

#[test]
fn test_defaults() {
    let config = WorkspaceConfig::default();
    assert_eq!(config.packages_dir, "packages");
    assert_eq!(config.package_manager, "pnpm");
    assert_eq!(config.output_dir, "dist");
    assert_eq!(config.parallel, 10);
    assert_eq!(config.script_parallel, 3);
    assert_eq!(config.order.len(), DEFAULT_ORDER.len());
    assert_eq!(config.order[0], "packages/");
    assert_eq!(config.command_timeout(), None);
}

#[test]
fn test_parse_partial_config() {
    let config = WorkspaceConfig::from_toml_str(
        r#"
[workspace]
package_manager = "npm"
order = ["packages/util", "packages/app"]
command_timeout_secs = 90
"#,
    )
    .unwrap();

    assert_eq!(config.package_manager, "npm");
    assert_eq!(config.order, vec!["packages/util", "packages/app"]);
    assert_eq!(config.command_timeout(), Some(Duration::from_secs(90)));
    assert_eq!(config.packages_dir, "packages");
    assert_eq!(config.parallel, 10);
}

#[test]
fn test_zero_timeout_disables_it() {
    let config = WorkspaceConfig::from_toml_str("[workspace]\ncommand_timeout_secs = 0\n").unwrap();
    assert_eq!(config.command_timeout(), None);
}

#[test]
fn test_empty_file_uses_defaults() {
    let config = WorkspaceConfig::from_toml_str("").unwrap();
    assert_eq!(config.package_manager, "pnpm");
}

#[test]
fn test_invalid_toml_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(CONFIG_FILE);
    fs::write(&path, "[workspace\nparallel = ").unwrap();

    match WorkspaceConfig::load(&path).unwrap_err() {
        Error::Toml { context, .. } => assert_eq!(context, path.display().to_string()),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_discover_walks_up() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join(CONFIG_FILE), "[workspace]\nparallel = 2\n").unwrap();
    let nested = root.join("packages").join("util").join("src");
    fs::create_dir_all(&nested).unwrap();

    let (found_root, config) = WorkspaceConfig::discover(&nested).unwrap();
    assert_eq!(found_root, root);
    assert_eq!(config.parallel, 2);
    assert_eq!(config.config_path, Some(root.join(CONFIG_FILE)));
}

#[test]
fn test_discover_stops_at_git_boundary() {
    let temp_dir = TempDir::new().unwrap();
    let outer = temp_dir.path();
    fs::write(outer.join(CONFIG_FILE), "[workspace]\nparallel = 2\n").unwrap();
    let repo = outer.join("repo");
    fs::create_dir_all(repo.join(".git")).unwrap();
    let start = repo.join("packages");
    fs::create_dir_all(&start).unwrap();

    let (found_root, config) = WorkspaceConfig::discover(&start).unwrap();
    assert_eq!(found_root, start);
    assert_eq!(config.parallel, 10);
    assert!(config.config_path.is_none());
}
