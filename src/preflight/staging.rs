//! Staged root checks.

use std::path::Path;

use crate::kmod::{find_kernel_version, modules_dir, FIRMWARE_DIR, MODULES_BASE};

use super::types::CheckResult;

/// Check the staged root has something to prune.
pub fn check_staging(root: &Path, kver: Option<&str>) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if !root.is_dir() {
        results.push(CheckResult::fail(
            "staged root",
            &format!("{} is not a directory", root.display()),
        ));
        return results;
    }
    results.push(CheckResult::pass_with("staged root", &root.display().to_string()));

    let kver = match kver {
        Some(k) => k.to_string(),
        None => match find_kernel_version(&root.join(MODULES_BASE)) {
            Ok(k) => k,
            Err(e) => {
                results.push(CheckResult::fail("kernel version", &e.to_string()));
                return results;
            }
        },
    };

    let tree = root.join(modules_dir(&kver));
    if !tree.is_dir() {
        results.push(CheckResult::fail(
            "module tree",
            &format!("{} not found", tree.display()),
        ));
        return results;
    }
    results.push(CheckResult::pass_with("module tree", &kver));

    if tree.join("modules.dep").exists() {
        results.push(CheckResult::pass("modules.dep"));
    } else {
        results.push(CheckResult::warn(
            "modules.dep",
            "Missing - modinfo cannot look up modules by name. Run depmod first.",
        ));
    }

    if root.join(FIRMWARE_DIR).is_dir() {
        results.push(CheckResult::pass("firmware tree"));
    } else {
        results.push(CheckResult::warn(
            "firmware tree",
            "No firmware installed - only modules will be considered",
        ));
    }

    results
}
