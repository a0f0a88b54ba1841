//! Module dependency and firmware records from `modinfo`.
//!
//! Running `modinfo` once per module is slow, so names are passed in bulk.
//! There are more modules than the kernel accepts as arguments in one exec,
//! so the list is split into chunks and the outputs are concatenated before
//! parsing. With `--null` every field is terminated by a NUL, which keeps the
//! concatenation a single well-formed stream.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::path::{Path, PathBuf};

use super::firmware::FirmwareInventory;
use super::{ModuleName, FIRMWARE_DIR};
use crate::diagnostics::Diagnostics;
use crate::process::Cmd;

/// Something that can describe a batch of modules in `modinfo --null` format.
pub trait ModuleInfoSource {
    fn query(&self, names: &[ModuleName]) -> Result<String>;
}

/// Runs the real `modinfo` against the staged root.
#[derive(Debug, Clone)]
pub struct ModinfoCommand {
    program: String,
    root: PathBuf,
    kver: String,
}

impl ModinfoCommand {
    pub fn new(root: &Path, kver: &str) -> Self {
        Self {
            program: "modinfo".to_string(),
            root: root.to_path_buf(),
            kver: kver.to_string(),
        }
    }

    /// Use a different binary, e.g. a wrapper that enters a sandbox.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl ModuleInfoSource for ModinfoCommand {
    fn query(&self, names: &[ModuleName]) -> Result<String> {
        let result = Cmd::new(&self.program)
            .arg("-b")
            .arg_path(&self.root)
            .args(["--set-version", &self.kver, "--null"])
            .args(names.iter().map(ModuleName::as_str))
            .error_msg(format!(
                "{} failed for kernel {}. Install: kmod",
                self.program, self.kver
            ))
            .run()?;
        Ok(result.stdout)
    }
}

/// Dependencies and firmware of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    /// `depends` followed by `softdep` entries, in the order they appeared.
    pub depends: Vec<ModuleName>,
    /// Root-relative firmware paths that exist on disk.
    pub firmware: BTreeSet<PathBuf>,
}

pub type ModuleRecords = BTreeMap<ModuleName, ModuleRecord>;

/// Query `names` in chunks of at most `chunk_size` and join the outputs.
///
/// Any failing chunk aborts the whole query.
pub fn fetch_module_info(
    source: &dyn ModuleInfoSource,
    names: &[ModuleName],
    chunk_size: usize,
) -> Result<String> {
    if chunk_size == 0 {
        bail!("modinfo chunk size must be at least 1");
    }

    let mut info = String::new();
    for (i, chunk) in names.chunks(chunk_size).enumerate() {
        let out = source
            .query(chunk)
            .with_context(|| format!("modinfo chunk {} ({} modules) failed", i + 1, chunk.len()))?;
        let out = out.trim();
        if out.is_empty() {
            continue;
        }
        info.push_str(out);
        if !out.ends_with('\0') {
            info.push('\0');
        }
    }
    Ok(info)
}

/// Parse concatenated `modinfo --null` output into per-module records.
///
/// `depends`, `softdep` and `firmware` fields accumulate until a `name`
/// field closes the record. A record seen twice keeps the latest copy.
pub fn parse_module_info(
    info: &str,
    firmware: &FirmwareInventory,
    diag: &mut dyn Diagnostics,
) -> Result<ModuleRecords> {
    let mut records = ModuleRecords::new();
    let mut depends = Vec::new();
    let mut fw = BTreeSet::new();

    for line in info.split('\0').flat_map(str::lines) {
        let (key, value) = match line.split_once(':') {
            Some(kv) => kv,
            None => line.split_once('=').unwrap_or((line, "")),
        };
        let value = value.trim();

        match key.trim() {
            "depends" => {
                depends.extend(value.split(',').filter(|d| !d.is_empty()).map(ModuleName::new));
            }
            "softdep" => {
                // pre: and post: markers are not module names
                depends.extend(
                    value
                        .split_whitespace()
                        .filter(|d| !d.ends_with(':'))
                        .map(ModuleName::new),
                );
            }
            "firmware" if !value.is_empty() => {
                let found = firmware.matching(value)?;
                if found.is_empty() {
                    diag.note(&format!(
                        "Not including missing firmware /{}/{} in the initrd",
                        FIRMWARE_DIR, value
                    ));
                }
                fw.extend(found);
            }
            "name" => {
                let name = ModuleName::new(value);
                let record = ModuleRecord {
                    depends: mem::take(&mut depends),
                    firmware: mem::take(&mut fw),
                };
                if records.insert(name.clone(), record).is_some() {
                    diag.note(&format!(
                        "modinfo reported {} more than once, keeping the last record",
                        name
                    ));
                }
            }
            _ => {}
        }
    }

    Ok(records)
}
