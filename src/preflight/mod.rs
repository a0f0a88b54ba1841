//! Preflight checks for module pruning.
//!
//! Validates the host tools and the staged root before anything is removed.
//! Run with `recmod preflight` to check everything is ready.

mod host_tools;
mod staging;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools(&config.modinfo));

    println!("Checking staged root...");
    checks.extend(staging::check_staging(
        &config.root,
        config.kernel_version.as_deref(),
    ));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(config: &Config) -> Result<()> {
    let report = run_preflight(config);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before pruning.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
