//! Host tool availability checks.

use crate::process;

use super::types::CheckResult;

/// Check the module introspection tool and friends are installed.
pub fn check_host_tools(modinfo: &str) -> Vec<CheckResult> {
    vec![
        check_tool_exists(modinfo, "kmod", "Required to read module dependencies", true),
        check_tool_exists(
            "depmod",
            "kmod",
            "Needed to regenerate modules.dep after pruning",
            false,
        ),
    ]
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path.to_string_lossy()),
        None => {
            let msg = format!("Not found. Install '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
