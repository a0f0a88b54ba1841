//! On-disk module inventory.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{is_module_file_name, modules_dir, ModuleName, MODULES_BUILTIN};
use crate::diagnostics::Diagnostics;

/// Every `.ko*` entry under a kernel's module tree plus the builtin list.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    /// Root-relative module paths.
    pub modules: BTreeSet<PathBuf>,
    pub builtin: BTreeSet<ModuleName>,
}

impl ModuleIndex {
    pub fn scan(root: &Path, kver: &str) -> Result<Self> {
        Ok(Self {
            modules: find_modules(root, kver)?,
            builtin: read_builtin(root, kver)?,
        })
    }
}

/// Recursively collect `*.ko*` entries below `usr/lib/modules/<kver>`.
///
/// A missing module tree yields an empty set.
pub fn find_modules(root: &Path, kver: &str) -> Result<BTreeSet<PathBuf>> {
    let rel_dir = modules_dir(kver);
    let dir = root.join(&rel_dir);
    let mut modules = BTreeSet::new();

    if !dir.is_dir() {
        return Ok(modules);
    }

    for entry in WalkDir::new(&dir).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !is_module_file_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?;
        modules.insert(rel.to_path_buf());
    }

    Ok(modules)
}

/// Parse `modules.builtin`, one module path per line.
///
/// The file is optional; without it nothing is builtin.
pub fn read_builtin(root: &Path, kver: &str) -> Result<BTreeSet<ModuleName>> {
    let path = root.join(modules_dir(kver)).join(MODULES_BUILTIN);
    if !path.exists() {
        return Ok(BTreeSet::new());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| ModuleName::from_path(Path::new(l)))
        .collect())
}

/// Map module names to their files.
///
/// Two files with the same name are ambiguous; the later path (in sorted
/// order) wins and the collision is reported.
pub fn name_to_file<'a>(
    modules: impl IntoIterator<Item = &'a PathBuf>,
    diag: &mut dyn Diagnostics,
) -> BTreeMap<ModuleName, PathBuf> {
    let mut map = BTreeMap::new();
    for path in modules {
        let name = ModuleName::from_path(path);
        if let Some(previous) = map.insert(name.clone(), path.clone()) {
            diag.note(&format!(
                "Module {} provided by both {} and {}, using the latter",
                name,
                previous.display(),
                path.display()
            ));
        }
    }
    map
}

/// Find the kernel version from the modules directory.
///
/// Used when the caller doesn't name one; picks the first directory that
/// looks like a release string.
pub fn find_kernel_version(modules_base: &Path) -> Result<String> {
    let mut entries = fs::read_dir(modules_base)
        .with_context(|| format!("Failed to read {}", modules_base.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.contains('.') && entry.path().is_dir() {
            return Ok(name_str.to_string());
        }
    }
    bail!(
        "Could not find a kernel modules directory in {}",
        modules_base.display()
    )
}
