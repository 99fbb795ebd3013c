//! In-memory converger that records every call.
//!
//! Models just enough of a filesystem (directories, files with mode and
//! ownership) for plans to be exercised without touching the disk: writes
//! fail when the parent directory was never ensured, and repeated writes of
//! identical content report [`Outcome::Unchanged`].

use super::{Converger, FileSpec, Instruction, Outcome};
use crate::error::{ConsulRenderError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    pub content: String,
    pub mode: u32,
    pub owner: String,
    pub group: String,
}

impl From<&FileSpec> for RecordedFile {
    fn from(spec: &FileSpec) -> Self {
        Self {
            content: spec.content.clone(),
            mode: spec.mode,
            owner: spec.owner.clone(),
            group: spec.group.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingConverger {
    directories: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, RecordedFile>,
    calls: Vec<Instruction>,
    fail_on: Option<PathBuf>,
}

impl RecordingConverger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `path` fail with a permission error.
    pub fn fail_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_on = Some(path.into());
        self
    }

    /// Every instruction received so far, failed ones included.
    pub fn calls(&self) -> &[Instruction] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<&RecordedFile> {
        self.files.get(path.as_ref())
    }

    pub fn files(&self) -> &BTreeMap<PathBuf, RecordedFile> {
        &self.files
    }

    pub fn has_directory(&self, path: impl AsRef<Path>) -> bool {
        self.directories.contains(path.as_ref())
    }

    fn check_failure(&self, path: &Path) -> Result<()> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(ConsulRenderError::filesystem(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"),
            ));
        }
        Ok(())
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && parent != Path::new("/") => {
                self.directories.contains(parent)
            }
            _ => true,
        }
    }

    fn missing_parent(path: &Path) -> ConsulRenderError {
        ConsulRenderError::filesystem(
            path,
            io::Error::new(io::ErrorKind::NotFound, "parent directory does not exist"),
        )
    }
}

impl Converger for RecordingConverger {
    fn ensure_directory(&mut self, path: &Path, recursive: bool) -> Result<Outcome> {
        self.calls.push(Instruction::EnsureDirectory {
            path: path.to_path_buf(),
            recursive,
        });
        self.check_failure(path)?;

        if self.directories.contains(path) {
            return Ok(Outcome::Unchanged);
        }
        if self.files.contains_key(path) {
            return Err(ConsulRenderError::filesystem(
                path,
                io::Error::new(io::ErrorKind::AlreadyExists, "path is a file"),
            ));
        }

        if recursive {
            for ancestor in path.ancestors() {
                if !ancestor.as_os_str().is_empty() {
                    self.directories.insert(ancestor.to_path_buf());
                }
            }
        } else {
            if !self.parent_exists(path) {
                return Err(Self::missing_parent(path));
            }
            self.directories.insert(path.to_path_buf());
        }
        Ok(Outcome::Created)
    }

    fn write_file(&mut self, file: &FileSpec) -> Result<Outcome> {
        self.calls.push(Instruction::WriteFile(file.clone()));
        self.check_failure(&file.path)?;

        if !self.parent_exists(&file.path) {
            return Err(Self::missing_parent(&file.path));
        }

        let desired = RecordedFile::from(file);
        match self.files.insert(file.path.clone(), desired.clone()) {
            None => Ok(Outcome::Created),
            Some(previous) if previous == desired => Ok(Outcome::Unchanged),
            Some(_) => Ok(Outcome::Updated),
        }
    }

    fn delete_file(&mut self, path: &Path) -> Result<Outcome> {
        self.calls.push(Instruction::DeleteFile {
            path: path.to_path_buf(),
        });
        self.check_failure(path)?;

        match self.files.remove(path) {
            Some(_) => Ok(Outcome::Removed),
            None => Ok(Outcome::Unchanged),
        }
    }
}
