//! CLI command implementation for `isoforge devices`

use anyhow::Result;

use crate::cli::output::{is_json, print_detail, print_info, print_warning};
use crate::core::devices::{discover_removable, render_candidates};
use crate::infra::process::SystemRunner;

/// Execute the devices command
pub async fn execute() -> Result<()> {
    let candidates = discover_removable(&SystemRunner);

    if is_json() {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        print_warning("No USB drives detected.");
        return Ok(());
    }

    print_info("Available USB drives:");
    for line in render_candidates(&candidates).lines() {
        print_detail(line.trim_start());
    }
    Ok(())
}
