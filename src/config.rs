//! Configuration management for recmod.
//!
//! Reads configuration from environment variables. `main` loads a `.env`
//! file first with dotenvy, so values there act as defaults that the real
//! environment overrides. CLI flags override both.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::kmod::DEFAULT_CHUNK_SIZE;

/// recmod configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Staged root containing usr/lib/modules and usr/lib/firmware.
    pub root: PathBuf,
    /// Kernel release; detected from the module tree when unset.
    pub kernel_version: Option<String>,
    /// Regex fragments protecting modules from exclusion.
    pub include: Vec<String>,
    /// Regex fragments selecting modules to drop.
    pub exclude: Vec<String>,
    /// Module introspection program.
    pub modinfo: String,
    /// Names per modinfo invocation.
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            kernel_version: None,
            include: Vec::new(),
            exclude: Vec::new(),
            modinfo: "modinfo".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let chunk_size = match env::var("RECMOD_CHUNK_SIZE") {
            Ok(value) => parse_chunk_size(&value)?,
            Err(_) => defaults.chunk_size,
        };

        Ok(Self {
            root: env::var("RECMOD_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            kernel_version: env::var("RECMOD_KERNEL_VERSION")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            include: env::var("RECMOD_INCLUDE")
                .map(|v| split_patterns(&v))
                .unwrap_or_default(),
            exclude: env::var("RECMOD_EXCLUDE")
                .map(|v| split_patterns(&v))
                .unwrap_or_default(),
            modinfo: env::var("RECMOD_MODINFO").unwrap_or(defaults.modinfo),
            chunk_size,
        })
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  RECMOD_ROOT: {}", self.root.display());
        println!(
            "  RECMOD_KERNEL_VERSION: {}",
            self.kernel_version.as_deref().unwrap_or("(auto-detect)")
        );
        println!("  RECMOD_INCLUDE: {}", self.include.join(" "));
        println!("  RECMOD_EXCLUDE: {}", self.exclude.join(" "));
        println!("  RECMOD_MODINFO: {}", self.modinfo);
        println!("  RECMOD_CHUNK_SIZE: {}", self.chunk_size);
        if self.exclude.is_empty() {
            println!("  Filtering: OFF (no exclude patterns, prune is a no-op)");
        } else {
            println!("  Filtering: ON");
        }
    }
}

/// Patterns are whitespace separated in the environment.
fn split_patterns(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn parse_chunk_size(value: &str) -> Result<usize> {
    let size: usize = value
        .trim()
        .parse()
        .with_context(|| format!("RECMOD_CHUNK_SIZE must be a number, got '{}'", value))?;
    if size == 0 {
        anyhow::bail!("RECMOD_CHUNK_SIZE must be at least 1");
    }
    Ok(size)
}
