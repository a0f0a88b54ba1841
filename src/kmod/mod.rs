//! Kernel module and firmware dependency closure.
//!
//! The pipeline runs in this order against one staged root and one kernel
//! version:
//!
//! ```text
//! index ──> filter ──> modinfo ──> closure ──> required ──> prune
//! ```
//!
//! - [`index`] - on-disk `.ko*` inventory and `modules.builtin`
//! - [`filter`] - include/exclude regex filtering
//! - [`host`] - include patterns from `/proc/modules`
//! - [`modinfo`] - chunked `modinfo --null` queries and record parsing
//! - [`closure`] - reachability over the dependency records
//! - [`required`] - ancestor dirs, metadata files and vdso
//! - [`prune`] - removal of everything not required
//!
//! All paths handled here are relative to the staged root.

pub mod closure;
pub mod filter;
pub mod firmware;
pub mod host;
pub mod index;
pub mod modinfo;
pub mod name;
pub mod prune;
pub mod required;

use std::path::PathBuf;

pub use closure::{resolve_module_dependencies, Closure, ResolveOptions};
pub use filter::{filter_kernel_modules, FilterSpec, Patterns};
pub use host::loaded_module_patterns;
pub use index::{find_kernel_version, ModuleIndex};
pub use modinfo::{ModinfoCommand, ModuleInfoSource, ModuleRecord, ModuleRecords};
pub use name::ModuleName;
pub use prune::{plan_removals, process_kernel_modules, PruneReport, RemovalPlan};
pub use required::{gen_required_kernel_modules, RequiredPaths};

/// Module trees live here, one directory per kernel version.
pub const MODULES_BASE: &str = "usr/lib/modules";

/// Firmware blobs, arbitrarily nested.
pub const FIRMWARE_DIR: &str = "usr/lib/firmware";

/// Ancestor directories are collected up to, but not including, this one.
pub const PARENT_BOUNDARY: &str = "usr/lib";

/// Names of the builtin list and the metadata prefix under the module tree.
pub const MODULES_BUILTIN: &str = "modules.builtin";
pub const METADATA_PREFIX: &str = "modules";

pub const VDSO_DIR: &str = "vdso";

/// Vendor microcode, loaded by the early initrd independently of any module.
pub const MICROCODE_DIRS: &[&str] = &["amd-ucode", "intel-ucode"];

/// `modinfo` is handed at most this many names per invocation.
pub const DEFAULT_CHUNK_SIZE: usize = 8500;

/// Root-relative module directory for a kernel version.
pub fn modules_dir(kver: &str) -> PathBuf {
    PathBuf::from(MODULES_BASE).join(kver)
}

/// Whether a file name looks like a kernel module (`*.ko*`).
pub fn is_module_file_name(name: &str) -> bool {
    name.contains(".ko")
}
