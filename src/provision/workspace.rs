//! Per-deployment copies of a module directory.
//!
//! Terraform keeps local state next to the configuration, so two tests that
//! apply the same module directory at once would share (and clobber) one
//! state file. Each deployment gets its own copy instead. Existing state,
//! lock info and the `.terraform` cache are left behind.

use crate::error::{HarnessError, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A private copy of one module, removed on drop unless kept.
#[derive(Debug)]
pub struct Workspace {
    root: TempDir,
    path: PathBuf,
}

fn is_local_state(name: &str) -> bool {
    name == ".terraform"
        || name.starts_with("terraform.tfstate")
        || name == ".terraform.tfstate.lock.info"
}

impl Workspace {
    /// Copy `module` into a fresh temp directory.
    ///
    /// # Errors
    ///
    /// Returns `ModuleNotFound` if `module` is not a directory, or an I/O
    /// error if the copy fails.
    pub fn copy_module(module: &Path) -> Result<Self> {
        if !module.is_dir() {
            return Err(HarnessError::ModuleNotFound {
                path: module.to_path_buf(),
            });
        }
        let root = tempfile::Builder::new().prefix("infratest-").tempdir()?;
        let name = module.file_name().unwrap_or_else(|| OsStr::new("module"));
        let path = root.path().join(name);

        let walker = WalkDir::new(module)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !is_local_state(&entry.file_name().to_string_lossy()));
        for entry in walker {
            let entry = entry.map_err(|err| HarnessError::Io(err.into()))?;
            let relative = entry.path().strip_prefix(module).unwrap_or(entry.path());
            let target = path.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }

        debug!(module = %module.display(), workspace = %path.display(), "module copied");
        Ok(Self { root, path })
    }

    /// Directory the tool should run in.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the copy (and its state) on disk and return its path.
    #[must_use]
    pub fn keep(self) -> PathBuf {
        let path = self.path;
        let root = self.root.keep();
        warn!(workspace = %path.display(), root = %root.display(), "workspace kept on disk");
        path
    }
}
