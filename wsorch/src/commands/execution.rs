//! Commands that run the package manager across packages.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use wsorch_core::{CleanTarget, TaskResult};

use crate::formatting::{
    create_spinner, print_key_value, print_package_list, print_section_header, print_success,
    print_task_results, print_warning, SectionStyle,
};
use crate::SelectionArgs;

use super::{open_workspace, print_duration, stream_to_terminal};

/// Prints the results table; returns whether anything failed.
fn report(results: &[TaskResult], title: &str, success_msg: &str) -> bool {
    print_section_header(title, SectionStyle::Primary);

    let failed = print_task_results(results);
    println!();

    if failed > 0 {
        print_warning(&format!(
            "{} succeeded, {} failed",
            results.len() - failed,
            failed
        ));
    } else {
        print_success(&success_msg.replace("{}", &results.len().to_string()));
    }

    failed > 0
}

pub fn cmd_install(root: Option<&Path>, select: &SelectionArgs, prod: bool) -> Result<()> {
    let start = Instant::now();
    print_section_header("Installing dependencies", SectionStyle::Primary);

    let spinner = create_spinner("Installing...");
    let workspace = stream_to_terminal(open_workspace(root, select.jobs())?, &spinner);
    let outcome = workspace.install(&select.selection(), prod);
    spinner.finish_and_clear();

    let results = outcome.context("install failed")?;
    report(&results, "Install Results", "Installed {} target(s)");
    print_duration(start);
    Ok(())
}

pub fn cmd_build(root: Option<&Path>, select: &SelectionArgs, dev: bool) -> Result<()> {
    let start = Instant::now();
    print_section_header("Building packages", SectionStyle::Primary);

    let spinner = create_spinner("Building...");
    let workspace = stream_to_terminal(open_workspace(root, select.jobs())?, &spinner);
    let outcome = workspace.build(&select.selection(), dev, select.parallel());
    spinner.finish_and_clear();

    let results = outcome.context("build failed")?;
    if results.is_empty() {
        print_success("All packages are up to date");
    } else {
        report(&results, "Build Results", "All {} packages built successfully");
    }
    print_duration(start);
    Ok(())
}

pub fn cmd_clean(
    root: Option<&Path>,
    select: &SelectionArgs,
    dist_only: bool,
    node_modules_only: bool,
) -> Result<()> {
    let start = Instant::now();
    let target = if dist_only {
        CleanTarget::OutputOnly
    } else if node_modules_only {
        CleanTarget::NodeModulesOnly
    } else {
        CleanTarget::All
    };
    print_section_header("Cleaning packages", SectionStyle::Primary);

    let spinner = create_spinner("Cleaning...");
    let workspace = stream_to_terminal(open_workspace(root, select.jobs())?, &spinner);
    let outcome = workspace.clean(&select.selection(), target, select.parallel());
    spinner.finish_and_clear();

    let report_data = outcome.context("clean failed")?;
    print_key_value("Deleted", &report_data.deleted.len().to_string());
    let deleted: Vec<String> = report_data
        .deleted
        .iter()
        .map(|p| {
            p.strip_prefix(workspace.root())
                .unwrap_or(p)
                .display()
                .to_string()
        })
        .collect();
    print_package_list(&deleted);
    println!();

    if !report_data.scripts.is_empty() {
        report(&report_data.scripts, "Clean Scripts", "Ran {} clean script(s)");
    }
    print_duration(start);
    Ok(())
}

/// Runs `<package manager> <args>` everywhere. Tolerant runs exit zero even
/// when packages fail, unless `strict_exit` is set.
pub fn cmd_run(
    root: Option<&Path>,
    select: &SelectionArgs,
    args: Vec<String>,
    tolerant: bool,
    strict_exit: bool,
) -> Result<()> {
    let start = Instant::now();
    let workspace = open_workspace(root, select.jobs())?;
    let title = format!("Running {} {}", workspace.config().package_manager, args.join(" "));
    print_section_header(&title, SectionStyle::Primary);

    let spinner = create_spinner("Running...");
    let workspace = stream_to_terminal(workspace, &spinner);
    let outcome = workspace.run_arbitrary(&select.selection(), &args, tolerant, select.parallel());
    spinner.finish_and_clear();

    let results = outcome.with_context(|| format!("'{}' failed", args.join(" ")))?;
    let failed = report(&results, "Results", "Succeeded in all {} packages");
    print_duration(start);

    if failed && strict_exit {
        std::process::exit(1);
    }

    Ok(())
}
