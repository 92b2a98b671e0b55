//! Information commands.

use std::path::Path;

use anyhow::Result;

use crate::formatting::{print_package_table, print_section_header, print_warning, SectionStyle};
use crate::SelectionArgs;

use super::open_workspace;

pub fn cmd_list(root: Option<&Path>, select: &SelectionArgs, json: bool) -> Result<()> {
    let workspace = open_workspace(root, None)?;
    let packages = workspace.describe(&select.selection())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    print_section_header("Packages", SectionStyle::Primary);
    if packages.is_empty() {
        print_warning("No packages found");
    } else {
        print_package_table(&packages);
    }
    println!();

    Ok(())
}
