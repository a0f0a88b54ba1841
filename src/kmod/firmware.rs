//! Firmware inventory and `modinfo` firmware glob matching.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{FIRMWARE_DIR, MICROCODE_DIRS};

/// Every entry below `usr/lib/firmware`, files and directories alike.
///
/// The inventory itself never follows symlinks, so a linked directory shows
/// up once as the link. Glob matching does follow them.
#[derive(Debug, Clone, Default)]
pub struct FirmwareInventory {
    root: PathBuf,
    /// Root-relative paths, sorted.
    entries: Vec<PathBuf>,
}

impl FirmwareInventory {
    pub fn scan(root: &Path) -> Result<Self> {
        let dir = root.join(FIRMWARE_DIR);
        let mut entries = Vec::new();

        if dir.is_dir() {
            for entry in WalkDir::new(&dir).min_depth(1) {
                let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
                let rel = entry.path().strip_prefix(root).with_context(|| {
                    format!("{} is outside {}", entry.path().display(), root.display())
                })?;
                entries.push(rel.to_path_buf());
            }
        }

        entries.sort();
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Everything matching the glob `<fragment>*` under the firmware tree.
    ///
    /// `modinfo` firmware lines are prefixes that may carry their own
    /// wildcards (`amdgpu/vega10_*`), so the value is treated as a glob.
    /// Symlinked directories along the way are followed, and when a match
    /// resolves to another path inside the firmware tree, that path is
    /// returned as well. A glob that can't be compiled matches nothing.
    pub fn matching(&self, fragment: &str) -> Result<Vec<PathBuf>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let glob = format!("{}*", fragment);
        let Ok(regex) = glob_to_regex(&glob) else {
            return Ok(Vec::new());
        };

        // Only walk below the literal leading components, and no deeper
        // than the glob itself reaches.
        let components: Vec<&str> = glob.split('/').filter(|c| !c.is_empty()).collect();
        let literal = components
            .iter()
            .take_while(|c| !c.contains(['*', '?', '[']))
            .count()
            .min(components.len() - 1);
        let firmware_dir = self.root.join(FIRMWARE_DIR);
        let base = components[..literal]
            .iter()
            .fold(firmware_dir.clone(), |path, c| path.join(c));
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let walker = WalkDir::new(&base)
            .follow_links(true)
            .min_depth(1)
            .max_depth(components.len() - literal);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.loop_ancestor().is_some() => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to walk {}", base.display()))
                }
            };
            let Ok(rel) = entry.path().strip_prefix(&firmware_dir) else {
                continue;
            };
            if regex.is_match(&rel.to_string_lossy()) {
                found.push(Path::new(FIRMWARE_DIR).join(rel));
            }
        }

        let targets = self.link_targets(&found)?;
        found.extend(targets);
        found.sort();
        found.dedup();
        Ok(found)
    }

    /// Real locations of `paths` that differ from the path itself and stay
    /// inside the firmware tree.
    fn link_targets(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let root = fs::canonicalize(&self.root)
            .with_context(|| format!("Failed to resolve {}", self.root.display()))?;

        Ok(paths
            .iter()
            .filter_map(|rel| {
                let real = fs::canonicalize(self.root.join(rel)).ok()?;
                let real = real.strip_prefix(&root).ok()?.to_path_buf();
                (real != *rel && real.starts_with(FIRMWARE_DIR)).then_some(real)
            })
            .collect())
    }
}

/// Whether a root-relative path lies inside a vendor microcode directory.
pub fn is_microcode(path: &Path) -> bool {
    let base = Path::new(FIRMWARE_DIR);
    MICROCODE_DIRS
        .iter()
        .any(|d| path.starts_with(base.join(d)))
}

/// Translate a shell glob into an anchored regex.
///
/// `*` and `?` stay within one path component, `[...]` classes are passed
/// through with `!` negation. Characters that are class operators in regex
/// syntax (`&&`, `--`, `~~`) are escaped. A class regex rejects, like a
/// reversed range, makes the whole glob an error.
pub fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let rewind = chars.clone();
                let mut class = String::new();
                let mut closed = false;
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    class.push('^');
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                    class.push_str("\\]");
                }
                let mut prev = None;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if matches!(c, '\\' | '[' | '&' | '~') || (c == '-' && prev == Some('-')) {
                        class.push('\\');
                    }
                    class.push(c);
                    prev = Some(c);
                }
                if closed {
                    out.push('[');
                    out.push_str(&class);
                    out.push(']');
                } else {
                    // Unterminated class, the bracket is a literal.
                    chars = rewind;
                    out.push_str("\\[");
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');

    Regex::new(&out).with_context(|| format!("Invalid firmware glob '{}'", glob))
}
