//! Command implementations for the CLI.

mod execution;
mod info;
mod maintenance;
mod sync_reporter;

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use tracing::debug;
use wsorch_core::config::CONFIG_FILE;
use wsorch_core::{Workspace, WorkspaceConfig};

use crate::formatting::{format_duration, print_separator_with_spacing, print_summary_box};

pub use execution::{cmd_build, cmd_clean, cmd_install, cmd_run};
pub use info::cmd_list;
pub use maintenance::{cmd_delete_package_lock, cmd_sync_versions};

/// Opens the workspace at `root`, or the one discovered from the current
/// directory. `jobs` overrides both worker bounds.
fn open_workspace(root: Option<&Path>, jobs: Option<usize>) -> Result<Workspace> {
    let (root, mut config) = match root {
        Some(root) => {
            let path = root.join(CONFIG_FILE);
            let config = if path.is_file() {
                WorkspaceConfig::load(&path)?
            } else {
                WorkspaceConfig::default()
            };
            (root.to_path_buf(), config)
        }
        None => WorkspaceConfig::discover(std::env::current_dir()?)?,
    };

    if let Some(jobs) = jobs {
        config.parallel = jobs;
        config.script_parallel = jobs;
    }

    debug!(root = %root.display(), config = ?config.config_path, "opening workspace");
    Ok(Workspace::new(root, config))
}

/// Prefixes each streamed line with its package, keeping the spinner intact.
fn stream_to_terminal(workspace: Workspace, spinner: &ProgressBar) -> Workspace {
    let spinner = spinner.clone();
    workspace.with_output_handler(move |package, line, is_stderr| {
        let prefix = format!("[{}]", package.short_name());
        spinner.suspend(|| {
            if is_stderr {
                eprintln!("  {} {}", prefix.bright_black().bold(), line.bright_red());
            } else {
                println!("  {} {}", prefix.bright_black().bold(), line);
            }
        });
    })
}

fn print_duration(start: Instant) {
    print_separator_with_spacing();
    let duration_str = format_duration(start.elapsed().as_secs_f64());
    print_summary_box("Summary", &[("Duration", &duration_str)]);
    println!();
}
