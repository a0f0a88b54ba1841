//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `prune` - Apply module filters to a staged root
//! - `plan` - Show what pruning would keep and remove
//! - `show` - Display information
//! - `preflight` - Run preflight checks

pub mod plan;
mod preflight;
pub mod prune;
pub mod show;

pub use plan::cmd_plan;
pub use preflight::cmd_preflight;
pub use prune::cmd_prune;
pub use show::cmd_show;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::kmod::{
    find_kernel_version, loaded_module_patterns, FilterSpec, ModinfoCommand, ResolveOptions,
    MODULES_BASE,
};

/// Everything the pipeline needs, resolved from config and flags.
pub struct Inputs {
    pub kver: String,
    pub spec: FilterSpec,
    pub options: ResolveOptions,
    pub source: ModinfoCommand,
}

impl Inputs {
    pub fn resolve(config: &Config, include_host: bool) -> Result<Self> {
        let kver = match &config.kernel_version {
            Some(k) => k.clone(),
            None => find_kernel_version(&config.root.join(MODULES_BASE))
                .context("No kernel version given and none could be detected")?,
        };

        let mut include = config.include.clone();
        if include_host {
            include.extend(loaded_module_patterns()?);
        }
        let spec = FilterSpec::new(&include, &config.exclude)?;

        let source = ModinfoCommand::new(&config.root, &kver).program(config.modinfo.clone());

        Ok(Self {
            kver,
            spec,
            options: ResolveOptions {
                chunk_size: config.chunk_size,
            },
            source,
        })
    }
}
