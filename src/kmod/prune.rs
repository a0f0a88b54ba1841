//! Removal of unrequired modules and firmware from the staged root.
//!
//! Candidates are visited in reverse path order so a directory's contents
//! are always handled before the directory itself. A directory that is still
//! non-empty when its turn comes means the required set or the ordering is
//! broken, and pruning stops with an error.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::closure::ResolveOptions;
use super::filter::FilterSpec;
use super::firmware::{is_microcode, FirmwareInventory};
use super::index::find_modules;
use super::modinfo::ModuleInfoSource;
use super::required::{gen_required_kernel_modules, RequiredPaths};
use crate::diagnostics::Diagnostics;

/// Paths that would be removed, in removal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalPlan {
    pub remove: Vec<PathBuf>,
    /// Not required, but spared because they are vendor microcode.
    pub microcode_kept: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub microcode_kept: usize,
}

/// Work out what pruning would remove without touching anything.
pub fn plan_removals(root: &Path, kver: &str, required: &RequiredPaths) -> Result<RemovalPlan> {
    let modules: Vec<PathBuf> = find_modules(root, kver)?.into_iter().rev().collect();
    let firmware = FirmwareInventory::scan(root)?;

    let mut plan = RemovalPlan::default();
    let candidates = modules
        .iter()
        .chain(firmware.entries().iter().rev());

    for path in candidates {
        if required.contains(path) {
            continue;
        }
        if is_microcode(path) {
            plan.microcode_kept.push(path.clone());
            continue;
        }
        plan.remove.push(path.clone());
    }

    Ok(plan)
}

/// Carry out a removal plan.
pub fn execute_plan(root: &Path, plan: &RemovalPlan) -> Result<PruneReport> {
    let mut report = PruneReport {
        microcode_kept: plan.microcode_kept.len(),
        ..Default::default()
    };

    for rel in &plan.remove {
        let path = root.join(rel);
        let meta = fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;

        if meta.is_dir() {
            let mut entries = fs::read_dir(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if entries.next().is_some() {
                bail!(
                    "Refusing to remove non-empty directory {}.\n\
                     Everything inside it should have been removed first or it should be required.",
                    path.display()
                );
            }
            fs::remove_dir(&path)
                .with_context(|| format!("Failed to remove directory {}", path.display()))?;
            report.dirs_removed += 1;
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            report.files_removed += 1;
        }
    }

    Ok(report)
}

/// Remove every module and firmware entry that isn't in `required`.
pub fn prune(root: &Path, kver: &str, required: &RequiredPaths) -> Result<PruneReport> {
    let plan = plan_removals(root, kver, required)?;
    execute_plan(root, &plan)
}

/// Apply the module filters to a staged root.
///
/// Returns `None` without touching the filesystem when there are no exclude
/// patterns.
pub fn process_kernel_modules(
    root: &Path,
    kver: &str,
    spec: &FilterSpec,
    options: &ResolveOptions,
    source: &dyn ModuleInfoSource,
    diag: &mut dyn Diagnostics,
) -> Result<Option<PruneReport>> {
    if !spec.has_exclude() {
        return Ok(None);
    }

    diag.step("Applying kernel module filters");
    let required = gen_required_kernel_modules(root, kver, spec, options, source, diag)?;
    let report = prune(root, kver, &required)?;

    diag.note(&format!(
        "Removed {} files and {} directories, kept {} microcode entries",
        report.files_removed, report.dirs_removed, report.microcode_kept
    ));

    Ok(Some(report))
}
