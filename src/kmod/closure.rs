//! Transitive closure over module dependency records.

use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use super::firmware::FirmwareInventory;
use super::index::{name_to_file, ModuleIndex};
use super::modinfo::{fetch_module_info, parse_module_info, ModuleInfoSource, ModuleRecords};
use super::{ModuleName, DEFAULT_CHUNK_SIZE};
use crate::diagnostics::Diagnostics;

/// Module and firmware files needed to load a set of modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Closure {
    pub modules: BTreeSet<PathBuf>,
    pub firmware: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Maximum number of names per `modinfo` invocation.
    pub chunk_size: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Walk the dependency graph from the builtin and requested modules.
///
/// Traversal is FIFO with a visited set; the same name may be queued several
/// times but is only expanded once, so queue order only affects how much
/// work is done, never the result. Dependencies that are neither on disk nor
/// builtin produce a warning and are otherwise ignored.
pub fn compute_closure(
    builtin: &BTreeSet<ModuleName>,
    requested: &[ModuleName],
    records: &ModuleRecords,
    files: &BTreeMap<ModuleName, PathBuf>,
    diag: &mut dyn Diagnostics,
) -> Closure {
    let mut todo: VecDeque<ModuleName> = builtin.iter().chain(requested).cloned().collect();
    let mut visited = BTreeSet::new();
    let mut firmware = BTreeSet::new();

    while let Some(module) = todo.pop_front() {
        if !visited.insert(module.clone()) {
            continue;
        }

        let Some(record) = records.get(&module) else {
            continue;
        };

        let mut reported = BTreeSet::new();
        for dep in &record.depends {
            if !files.contains_key(dep) && !builtin.contains(dep) && reported.insert(dep) {
                diag.warn(&format!(
                    "{} is a dependency of {} but is not installed, ignoring",
                    dep, module
                ));
            }
        }

        todo.extend(record.depends.iter().cloned());
        firmware.extend(record.firmware.iter().cloned());
    }

    Closure {
        modules: visited.iter().filter_map(|m| files.get(m).cloned()).collect(),
        firmware,
    }
}

/// Compute the module and firmware files required by `modules`.
///
/// Every on-disk module is described by `source`, then the closure is taken
/// from the builtin set plus `modules`. Paths are relative to `root`.
pub fn resolve_module_dependencies(
    root: &Path,
    kver: &str,
    modules: &[ModuleName],
    options: &ResolveOptions,
    source: &dyn ModuleInfoSource,
    diag: &mut dyn Diagnostics,
) -> Result<Closure> {
    let index = ModuleIndex::scan(root, kver)?;
    let files = name_to_file(&index.modules, diag);

    diag.step("Running modinfo to fetch kernel module dependencies");
    let names: Vec<ModuleName> = files.keys().cloned().collect();
    let info = fetch_module_info(source, &names, options.chunk_size)?;

    diag.step("Calculating required kernel modules and firmware");
    let firmware = FirmwareInventory::scan(root)?;
    let records = parse_module_info(&info, &firmware, diag)?;

    Ok(compute_closure(&index.builtin, modules, &records, &files, diag))
}
