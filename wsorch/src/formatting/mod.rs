//! CLI formatting utilities.
//!
//! Colors, headers, tables and the progress spinner used by every command.

mod headers;
mod output;
mod progress;
mod status;
mod tables;

pub use headers::{print_section_header, SectionStyle};
pub use output::{format_duration, print_key_value, print_separator_with_spacing, print_summary_box};
pub use progress::create_spinner;
pub use status::{print_success, print_warning};
pub use tables::{print_change_table, print_package_list, print_package_table, print_task_results};
