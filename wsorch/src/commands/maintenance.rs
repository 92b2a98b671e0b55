//! Manifest and lockfile maintenance commands.

use std::path::Path;

use anyhow::{Context, Result};

use crate::formatting::{
    print_change_table, print_key_value, print_package_list, print_section_header, print_success,
    SectionStyle,
};
use crate::SelectionArgs;

use super::open_workspace;
use super::sync_reporter::CliSyncReporter;

pub fn cmd_sync_versions(root: Option<&Path>, dry_run: bool) -> Result<()> {
    let workspace = open_workspace(root, None)?;

    let title = if dry_run {
        "Dependency Versions (Dry Run)"
    } else {
        "Dependency Versions"
    };
    let style = if dry_run {
        SectionStyle::Warning
    } else {
        SectionStyle::Primary
    };
    print_section_header(title, style);

    let changes = workspace
        .sync_versions(dry_run, CliSyncReporter)
        .context("version sync failed")?;
    println!();

    if changes.is_empty() {
        print_success("All workspace dependency ranges are current");
    } else {
        print_key_value("Ranges to update", &changes.len().to_string());
        println!();
        print_change_table(&changes);
    }
    println!();

    Ok(())
}

pub fn cmd_delete_package_lock(root: Option<&Path>, select: &SelectionArgs) -> Result<()> {
    let workspace = open_workspace(root, select.jobs())?;
    print_section_header("Deleting package locks", SectionStyle::Primary);

    let removed = workspace
        .delete_package_lock(&select.selection())
        .context("deleting package locks failed")?;

    print_key_value("Removed", &removed.len().to_string());
    let removed: Vec<String> = removed
        .iter()
        .map(|p| {
            p.strip_prefix(workspace.root())
                .unwrap_or(p)
                .display()
                .to_string()
        })
        .collect();
    print_package_list(&removed);
    println!();

    Ok(())
}
