//! Include/exclude filtering of the module inventory.
//!
//! Include is protective only: a match shields a module from the exclude
//! patterns, it never adds anything that isn't already on disk.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::index::find_modules;

/// A list of regex fragments compiled into one alternation.
#[derive(Debug, Clone, Default)]
pub enum Patterns {
    /// No fragments were given. Matches nothing.
    #[default]
    None,
    Compiled(Regex),
}

impl Patterns {
    pub fn compile<I, S>(fragments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fragments: Vec<String> = fragments
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect();
        if fragments.is_empty() {
            return Ok(Self::None);
        }

        let alternation = fragments.join("|");
        let regex = Regex::new(&alternation)
            .with_context(|| format!("Invalid module pattern '{}'", alternation))?;
        Ok(Self::Compiled(regex))
    }

    /// Unanchored search, like `re.search`.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::None => false,
            Self::Compiled(regex) => regex.is_match(text),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub include: Patterns,
    pub exclude: Patterns,
}

impl FilterSpec {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Ok(Self {
            include: Patterns::compile(include).context("Failed to compile include patterns")?,
            exclude: Patterns::compile(exclude).context("Failed to compile exclude patterns")?,
        })
    }

    /// Filtering, and therefore pruning, only happens with an exclude list.
    pub fn has_exclude(&self) -> bool {
        !self.exclude.is_none()
    }
}

/// The string patterns are matched against: the root-relative path without
/// its leading `usr`, i.e. `lib/modules/<kver>/kernel/...`.
pub fn match_subject(path: &Path) -> String {
    path.components()
        .skip(1)
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}

/// Apply the filter to an inventory and return the survivors, sorted.
pub fn filter_modules(modules: &BTreeSet<PathBuf>, spec: &FilterSpec) -> Vec<PathBuf> {
    let keep: BTreeSet<&PathBuf> = modules
        .iter()
        .filter(|m| spec.include.is_match(&match_subject(m)))
        .collect();

    modules
        .iter()
        .filter(|m| keep.contains(m) || !spec.exclude.is_match(&match_subject(m)))
        .cloned()
        .collect()
}

/// Scan the module tree of `kver` and filter it.
pub fn filter_kernel_modules(root: &Path, kver: &str, spec: &FilterSpec) -> Result<Vec<PathBuf>> {
    let modules = find_modules(root, kver)?;
    Ok(filter_modules(&modules, spec))
}
