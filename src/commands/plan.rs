//! Plan command - shows the required set and what pruning would remove.

use anyhow::Result;
use serde::Serialize;

use super::Inputs;
use crate::config::Config;
use crate::diagnostics::{ConsoleDiagnostics, Diagnostic, Diagnostics, RecordingDiagnostics};
use crate::kmod::{gen_required_kernel_modules, plan_removals, RemovalPlan, RequiredPaths};

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub kernel_version: String,
    /// False when no exclude patterns were given; `prune` won't touch anything.
    pub active: bool,
    pub required: RequiredPaths,
    pub removals: RemovalPlan,
    pub diagnostics: Vec<Diagnostic>,
}

/// Execute the plan command.
pub fn cmd_plan(config: &Config, include_host: bool, verbose: bool, json: bool) -> Result<()> {
    let inputs = Inputs::resolve(config, include_host)?;

    if json {
        // Keep stdout clean for the JSON document.
        let mut diag = RecordingDiagnostics::new();
        let mut output = build_plan(config, &inputs, &mut diag)?;
        output.diagnostics = diag.entries;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let mut diag = ConsoleDiagnostics::new(verbose);
    let output = build_plan(config, &inputs, &mut diag)?;
    print_plan(&output, verbose);
    Ok(())
}

pub fn build_plan(
    config: &Config,
    inputs: &Inputs,
    diag: &mut dyn Diagnostics,
) -> Result<PlanOutput> {
    let required = gen_required_kernel_modules(
        &config.root,
        &inputs.kver,
        &inputs.spec,
        &inputs.options,
        &inputs.source,
        diag,
    )?;

    let active = inputs.spec.has_exclude();
    let removals = if active {
        plan_removals(&config.root, &inputs.kver, &required)?
    } else {
        RemovalPlan::default()
    };

    Ok(PlanOutput {
        kernel_version: inputs.kver.clone(),
        active,
        required,
        removals,
        diagnostics: Vec::new(),
    })
}

fn print_plan(output: &PlanOutput, verbose: bool) {
    println!("Kernel version: {}", output.kernel_version);
    println!(
        "  Required: {} modules, {} firmware files, {} paths total",
        output.required.closure.modules.len(),
        output.required.closure.firmware.len(),
        output.required.len()
    );

    if !output.active {
        println!("  No exclude patterns given, prune would not remove anything.");
        return;
    }

    println!("  Would remove: {} paths", output.removals.remove.len());
    println!("  Microcode kept: {} paths", output.removals.microcode_kept.len());

    if verbose {
        for path in &output.removals.remove {
            println!("    - /{}", path.display());
        }
    }
}
