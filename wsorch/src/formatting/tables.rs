//! Table formatting utilities using comfy-table.

use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use wsorch_core::{PackageInfo, TaskResult, VersionChange};

use super::status::Status;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(*h).add_attribute(comfy_table::Attribute::Bold))
                .collect::<Vec<_>>(),
        )
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

/// Prints one row per command run and returns how many failed.
pub fn print_task_results(results: &[TaskResult]) -> usize {
    let mut table = new_table(&["Status", "Package", "Details"]);
    let mut failed = 0;

    for result in results {
        let package = result.package.to_string();
        if result.success {
            table.add_row(vec![
                Cell::new(Status::Success.symbol()).fg(comfy_table::Color::Green),
                Cell::new(package).fg(comfy_table::Color::White),
                Cell::new(""),
            ]);
        } else {
            let details = match result.exit_code {
                Some(code) => format!("{} (exit {})", result.command, code),
                None => format!("{} (killed)", result.command),
            };
            table.add_row(vec![
                Cell::new(Status::Error.symbol()).fg(comfy_table::Color::Red),
                Cell::new(package).fg(comfy_table::Color::Red),
                Cell::new(details).fg(comfy_table::Color::Red),
            ]);
            failed += 1;
        }
    }

    println!("{}", table);
    failed
}

/// Prints packages with their manifest name, version and build state.
pub fn print_package_table(packages: &[PackageInfo]) {
    let mut table = new_table(&["Package", "Name", "Version", "Build"]);

    for info in packages {
        let (state, color) = if info.needs_build {
            ("stale", comfy_table::Color::Yellow)
        } else {
            ("up to date", comfy_table::Color::Green)
        };
        table.add_row(vec![
            Cell::new(info.package.to_string()).fg(comfy_table::Color::White),
            Cell::new(info.name.as_deref().unwrap_or("-")).fg(comfy_table::Color::DarkGrey),
            Cell::new(info.version.as_deref().unwrap_or("-")).fg(comfy_table::Color::Cyan),
            Cell::new(state).fg(color),
        ]);
    }

    println!("{}", table);
}

pub fn print_change_table(changes: &[VersionChange]) {
    let mut table = new_table(&["Package", "Dependency", "Section", "Range"]);

    for change in changes {
        let range = format!(
            "{} → {}",
            change.old_range.as_deref().unwrap_or("(new)"),
            change.new_range
        );
        table.add_row(vec![
            Cell::new(change.package.display()).fg(comfy_table::Color::White),
            Cell::new(&change.dependency),
            Cell::new(change.section.to_string()).fg(comfy_table::Color::DarkGrey),
            Cell::new(range).fg(comfy_table::Color::Cyan),
        ]);
    }

    println!("{}", table);
}

/// Prints a simple list (one item per line).
pub fn print_package_list(items: &[String]) {
    if items.is_empty() {
        println!("  {} {}", "→".cyan(), "(none)".bright_black());
        return;
    }

    for item in items {
        println!("  {} {}", "→".cyan(), item.bold().white());
    }
}
