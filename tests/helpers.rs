//! Shared test utilities for recmod tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use recmod::kmod::{ModuleInfoSource, ModuleName};

pub const KVER: &str = "6.12.0-test";

/// Staged root in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("staging");
        fs::create_dir_all(&root).expect("Failed to create staging dir");

        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn modules_rel(&self) -> PathBuf {
        PathBuf::from(format!("usr/lib/modules/{KVER}"))
    }

    /// Create `kernel/<subdir>/<name>.ko.xz` and return its relative path.
    pub fn add_module(&self, subdir: &str, name: &str) -> PathBuf {
        let rel = self
            .modules_rel()
            .join("kernel")
            .join(subdir)
            .join(format!("{name}.ko.xz"));
        self.touch(&rel);
        rel
    }

    pub fn add_firmware(&self, rel: &str) -> PathBuf {
        let rel = PathBuf::from("usr/lib/firmware").join(rel);
        self.touch(&rel);
        rel
    }

    pub fn add_metadata(&self, name: &str) -> PathBuf {
        let rel = self.modules_rel().join(name);
        self.touch(&rel);
        rel
    }

    pub fn write_builtin(&self, lines: &[&str]) {
        let path = self.root.join(self.modules_rel()).join("modules.builtin");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, lines.join("\n")).unwrap();
    }

    pub fn touch(&self, rel: &Path) {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent dir");
        fs::write(path, b"").expect("Failed to create file");
    }

    /// Create a symlink at `rel` pointing to `target` (stored as given).
    pub fn symlink(&self, rel: &str, target: &str) -> PathBuf {
        let rel = PathBuf::from(rel);
        let path = self.root.join(&rel);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent dir");
        std::os::unix::fs::symlink(target, &path).expect("Failed to create symlink");
        rel
    }

    pub fn exists(&self, rel: &Path) -> bool {
        self.root.join(rel).exists()
    }

    /// Like `exists`, but a dangling symlink still counts.
    pub fn is_present(&self, rel: &Path) -> bool {
        fs::symlink_metadata(self.root.join(rel)).is_ok()
    }

    /// Every path under the staged root, relative.
    pub fn snapshot(&self) -> BTreeSet<PathBuf> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap().path().strip_prefix(&self.root).unwrap().to_path_buf())
            .collect()
    }
}

/// One module as the fake `modinfo` describes it.
#[derive(Debug, Clone, Default)]
pub struct FakeModule {
    pub depends: Vec<String>,
    pub softdep: Option<String>,
    pub firmware: Vec<String>,
}

/// In-memory stand-in for `modinfo --null`.
#[derive(Debug, Default)]
pub struct FakeModinfo {
    pub modules: BTreeMap<String, FakeModule>,
    /// Chunk sizes seen, in call order.
    pub calls: RefCell<Vec<usize>>,
    pub fail: bool,
}

impl FakeModinfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. The name is emitted exactly as given.
    pub fn module(mut self, name: &str, depends: &[&str]) -> Self {
        self.modules.insert(
            name.to_string(),
            FakeModule {
                depends: depends.iter().map(|d| d.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn softdep(mut self, name: &str, softdep: &str) -> Self {
        self.modules.entry(name.to_string()).or_default().softdep = Some(softdep.to_string());
        self
    }

    pub fn firmware(mut self, name: &str, firmware: &str) -> Self {
        self.modules
            .entry(name.to_string())
            .or_default()
            .firmware
            .push(firmware.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn describe(&self, queried: &ModuleName) -> String {
        let found = self
            .modules
            .iter()
            .find(|(name, _)| ModuleName::new(name) == *queried);

        let Some((name, module)) = found else {
            return format!("name:           {}\0", queried);
        };

        let mut out = format!("filename:       /usr/lib/modules/{KVER}/kernel/{name}.ko.xz\0");
        for fw in &module.firmware {
            out.push_str(&format!("firmware:       {fw}\0"));
        }
        if let Some(softdep) = &module.softdep {
            out.push_str(&format!("softdep:        {softdep}\0"));
        }
        out.push_str(&format!("depends:        {}\0", module.depends.join(",")));
        out.push_str(&format!("name:           {name}\0"));
        out.push_str(&format!("vermagic:       {KVER} SMP preempt mod_unload\0"));
        out
    }
}

impl ModuleInfoSource for FakeModinfo {
    fn query(&self, names: &[ModuleName]) -> Result<String> {
        self.calls.borrow_mut().push(names.len());
        if self.fail {
            bail!("modinfo: ERROR: could not open modules.dep");
        }
        Ok(names.iter().map(|n| self.describe(n)).collect())
    }
}

pub fn paths(rels: &[&PathBuf]) -> BTreeSet<PathBuf> {
    rels.iter().map(|p| (*p).clone()).collect()
}
