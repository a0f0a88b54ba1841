//! recmod library exports.
//!
//! Computes the kernel module and firmware closure of a staged root and
//! prunes everything outside it. The CLI in `main.rs` is a thin wrapper;
//! integration tests drive the [`kmod`] pipeline directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use recmod::diagnostics::ConsoleDiagnostics;
//! use recmod::kmod::{process_kernel_modules, FilterSpec, ModinfoCommand, ResolveOptions};
//!
//! let spec = FilterSpec::new(["/ext4\\.ko"], ["kernel/drivers/gpu"])?;
//! let source = ModinfoCommand::new(root, kver);
//! let mut diag = ConsoleDiagnostics::new(false);
//! process_kernel_modules(root, kver, &spec, &ResolveOptions::default(), &source, &mut diag)?;
//! ```

pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod kmod;
pub mod preflight;
pub mod process;
