//! Expand a closure into every path that has to survive pruning.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::closure::{resolve_module_dependencies, Closure, ResolveOptions};
use super::filter::{filter_kernel_modules, FilterSpec};
use super::firmware::FirmwareInventory;
use super::index::find_modules;
use super::modinfo::ModuleInfoSource;
use super::{modules_dir, ModuleName, METADATA_PREFIX, PARENT_BOUNDARY, VDSO_DIR};
use crate::diagnostics::Diagnostics;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequiredPaths {
    pub closure: Closure,
    /// Closure plus ancestors, metadata files and vdso. Root-relative.
    pub paths: BTreeSet<PathBuf>,
}

impl RequiredPaths {
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Ancestors of `path` strictly below `below`, nearest first.
///
/// Empty when `path` is not inside `below`.
pub fn parents_below(path: &Path, below: &Path) -> Vec<PathBuf> {
    if !path.starts_with(below) {
        return Vec::new();
    }
    path.ancestors()
        .skip(1)
        .take_while(|p| *p != below)
        .map(Path::to_path_buf)
        .collect()
}

/// Add directory structure, module metadata and vdso to a closure.
pub fn expand_required(root: &Path, kver: &str, closure: Closure) -> Result<RequiredPaths> {
    let boundary = Path::new(PARENT_BOUNDARY);
    let modules_dir = modules_dir(kver);
    let mut paths = BTreeSet::new();

    for file in closure.modules.iter().chain(&closure.firmware) {
        paths.extend(parents_below(file, boundary));
        paths.insert(file.clone());
    }

    // modules.dep, modules.alias.bin, ... are read by modprobe at boot
    for name in list_dir(&root.join(&modules_dir))? {
        if name.starts_with(METADATA_PREFIX) {
            paths.insert(modules_dir.join(name));
        }
    }

    let vdso = modules_dir.join(VDSO_DIR);
    if root.join(&vdso).exists() {
        if closure.modules.is_empty() {
            paths.extend(parents_below(&vdso, boundary));
        }
        for name in list_dir(&root.join(&vdso))? {
            paths.insert(vdso.join(name));
        }
        paths.insert(vdso);
    }

    Ok(RequiredPaths { closure, paths })
}

/// Compute the set of module and firmware paths to keep for `kver`.
///
/// Without exclude patterns and without any firmware there is nothing the
/// dependency walk could remove, so every module on disk is kept as is.
pub fn gen_required_kernel_modules(
    root: &Path,
    kver: &str,
    spec: &FilterSpec,
    options: &ResolveOptions,
    source: &dyn ModuleInfoSource,
    diag: &mut dyn Diagnostics,
) -> Result<RequiredPaths> {
    let firmware = FirmwareInventory::scan(root)?;

    let closure = if spec.has_exclude() || !firmware.is_empty() {
        let modules = filter_kernel_modules(root, kver, spec)?;
        let names: Vec<ModuleName> = modules.iter().map(|m| ModuleName::from_path(m)).collect();
        resolve_module_dependencies(root, kver, &names, options, source, diag)?
    } else {
        diag.note("No modules excluded and no firmware installed, using kernel modules generation fast path");
        Closure {
            modules: find_modules(root, kver)?,
            firmware: BTreeSet::new(),
        }
    };

    expand_required(root, kver, closure)
}

/// File names directly inside `dir`, or nothing if it doesn't exist.
fn list_dir(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KVER: &str = "6.12.0-test";

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_parents_below_stops_at_boundary() {
        let parents = parents_below(
            Path::new("usr/lib/modules/k/kernel/fs/ext4.ko"),
            Path::new("usr/lib"),
        );
        assert_eq!(
            parents,
            vec![
                PathBuf::from("usr/lib/modules/k/kernel/fs"),
                PathBuf::from("usr/lib/modules/k/kernel"),
                PathBuf::from("usr/lib/modules/k"),
                PathBuf::from("usr/lib/modules"),
            ]
        );
    }

    #[test]
    fn test_parents_below_outside_boundary() {
        assert!(parents_below(Path::new("etc/modprobe.d/x.conf"), Path::new("usr/lib")).is_empty());
    }

    #[test]
    fn test_expand_adds_ancestors_and_metadata() {
        let temp = TempDir::new().unwrap();
        let base = format!("usr/lib/modules/{KVER}");
        touch(temp.path(), &format!("{base}/kernel/fs/ext4.ko"));
        touch(temp.path(), &format!("{base}/modules.dep"));
        touch(temp.path(), &format!("{base}/modules.alias.bin"));
        touch(temp.path(), &format!("{base}/System.map"));

        let closure = Closure {
            modules: [PathBuf::from(format!("{base}/kernel/fs/ext4.ko"))].into(),
            firmware: [PathBuf::from("usr/lib/firmware/intel/fw.bin")].into(),
        };
        let required = expand_required(temp.path(), KVER, closure).unwrap();

        assert!(required.contains(Path::new(&format!("{base}/kernel/fs"))));
        assert!(required.contains(Path::new("usr/lib/modules")));
        assert!(required.contains(Path::new("usr/lib/firmware/intel")));
        assert!(required.contains(Path::new("usr/lib/firmware")));
        assert!(!required.contains(Path::new("usr/lib")));
        assert!(required.contains(Path::new(&format!("{base}/modules.dep"))));
        assert!(required.contains(Path::new(&format!("{base}/modules.alias.bin"))));
        assert!(!required.contains(Path::new(&format!("{base}/System.map"))));
    }

    #[test]
    fn test_vdso_kept_with_ancestors_when_no_modules() {
        let temp = TempDir::new().unwrap();
        let base = format!("usr/lib/modules/{KVER}");
        touch(temp.path(), &format!("{base}/vdso/vdso64.so"));

        let required = expand_required(temp.path(), KVER, Closure::default()).unwrap();

        assert!(required.contains(Path::new(&format!("{base}/vdso"))));
        assert!(required.contains(Path::new(&format!("{base}/vdso/vdso64.so"))));
        assert!(required.contains(Path::new(&base)));
        assert!(required.contains(Path::new("usr/lib/modules")));
    }

    #[test]
    fn test_no_vdso_no_entries() {
        let temp = TempDir::new().unwrap();
        let required = expand_required(temp.path(), KVER, Closure::default()).unwrap();
        assert!(required.is_empty());
    }
}
