//! Include patterns for the modules loaded on the build host.

use anyhow::{Context, Result};
use std::fs;

const PROC_MODULES: &str = "/proc/modules";

/// Turn `/proc/modules` content into include fragments.
///
/// Loaded modules are listed with underscores but the file names might use
/// dashes, so each underscore matches either.
pub fn host_module_patterns(proc_modules: &str) -> Vec<String> {
    proc_modules
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| format!(r"/{}\.ko", regex::escape(name).replace('_', "[_-]")))
        .collect()
}

/// Include fragments for every module currently loaded on this machine.
pub fn loaded_module_patterns() -> Result<Vec<String>> {
    let content = fs::read_to_string(PROC_MODULES)
        .with_context(|| format!("Failed to read {}", PROC_MODULES))?;
    Ok(host_module_patterns(&content))
}
