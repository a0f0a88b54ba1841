//! Prune command - removes unrequired modules and firmware.

use anyhow::Result;

use super::Inputs;
use crate::config::Config;
use crate::diagnostics::ConsoleDiagnostics;
use crate::kmod::process_kernel_modules;

/// Execute the prune command.
pub fn cmd_prune(config: &Config, include_host: bool, verbose: bool) -> Result<()> {
    let inputs = Inputs::resolve(config, include_host)?;
    let mut diag = ConsoleDiagnostics::new(verbose);

    println!("Kernel version: {}", inputs.kver);

    let report = process_kernel_modules(
        &config.root,
        &inputs.kver,
        &inputs.spec,
        &inputs.options,
        &inputs.source,
        &mut diag,
    )?;

    match report {
        None => println!("No exclude patterns given, nothing to prune."),
        Some(report) => println!(
            "Removed {} files and {} directories ({} microcode entries kept)",
            report.files_removed, report.dirs_removed, report.microcode_kept
        ),
    }

    Ok(())
}
