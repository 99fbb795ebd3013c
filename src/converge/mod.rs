//! Filesystem convergence.
//!
//! Renderers never touch the disk themselves. A `create` or `delete` action
//! turns a desired-state record into a [`Plan`]: an ordered batch of
//! [`Instruction`]s. [`apply`] hands each instruction to a [`Converger`] in
//! order and stops at the first error, so a failed step never leaves later
//! files written on top of a missing prerequisite.
//!
//! Every converger operation is idempotent and reports an [`Outcome`]; the
//! [`ConvergeReport`] for a whole plan answers "did anything change?".

pub mod local;
pub mod recording;

pub use local::LocalConverger;
pub use recording::RecordingConverger;

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Desired content and metadata of one file.
#[derive(Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub content: String,
    pub mode: u32,
    pub owner: String,
    pub group: String,
    /// Sensitive content is never logged, digested or printed.
    pub sensitive: bool,
}

impl FileSpec {
    /// md5 of the content, or `None` for sensitive files.
    pub fn digest(&self) -> Option<String> {
        if self.sensitive {
            None
        } else {
            Some(format!("{:x}", md5::compute(self.content.as_bytes())))
        }
    }
}

impl fmt::Debug for FileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("FileSpec");
        out.field("path", &self.path);
        if self.sensitive {
            out.field("content", &"<sensitive>");
        } else {
            out.field("content", &self.content);
        }
        out.field("mode", &format_args!("{:04o}", self.mode));
        out.field("owner", &self.owner)
            .field("group", &self.group)
            .field("sensitive", &self.sensitive);
        out.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    EnsureDirectory { path: PathBuf, recursive: bool },
    WriteFile(FileSpec),
    DeleteFile { path: PathBuf },
}

impl Instruction {
    pub fn path(&self) -> &Path {
        match self {
            Instruction::EnsureDirectory { path, .. } => path,
            Instruction::WriteFile(file) => &file.path,
            Instruction::DeleteFile { path } => path,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::EnsureDirectory { path, recursive } => {
                write!(f, "directory {}", path.display())?;
                if *recursive {
                    write!(f, " (recursive)")?;
                }
                Ok(())
            }
            Instruction::WriteFile(file) => {
                write!(
                    f,
                    "file {} mode {:04o} owner {}:{}",
                    file.path.display(),
                    file.mode,
                    file.owner,
                    file.group
                )?;
                match file.digest() {
                    Some(digest) => write!(f, " md5 {}", digest),
                    None => write!(f, " content suppressed (sensitive)"),
                }
            }
            Instruction::DeleteFile { path } => write!(f, "delete {}", path.display()),
        }
    }
}

/// Ordered batch of instructions produced by one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    instructions: Vec<Instruction>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_directory(&mut self, path: impl Into<PathBuf>, recursive: bool) {
        self.instructions.push(Instruction::EnsureDirectory {
            path: path.into(),
            recursive,
        });
    }

    /// Recursively ensure the directory holding `file` exists.
    ///
    /// A bare file name lives in `.`; only a root path has no parent to ensure.
    pub fn ensure_parent_directory(&mut self, file: &Path) {
        match file.parent() {
            Some(parent) if parent.as_os_str().is_empty() => self.ensure_directory(".", true),
            Some(parent) => self.ensure_directory(parent, true),
            None => {}
        }
    }

    pub fn write_file(&mut self, file: FileSpec) {
        self.instructions.push(Instruction::WriteFile(file));
    }

    pub fn delete_file(&mut self, path: impl Into<PathBuf>) {
        self.instructions
            .push(Instruction::DeleteFile { path: path.into() });
    }

    /// Append another plan's instructions after this one's.
    pub fn extend(&mut self, other: Plan) {
        self.instructions.extend(other.instructions);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// What a single converger operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Created,
    Updated,
    Removed,
}

impl Outcome {
    pub fn is_change(self) -> bool {
        self != Outcome::Unchanged
    }
}

/// Per-instruction outcomes of one applied plan, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    pub entries: Vec<(PathBuf, Outcome)>,
}

impl ConvergeReport {
    fn record(&mut self, path: &Path, outcome: Outcome) {
        self.entries.push((path.to_path_buf(), outcome));
    }

    /// True when at least one instruction changed the filesystem.
    pub fn updated(&self) -> bool {
        self.entries.iter().any(|(_, outcome)| outcome.is_change())
    }

    pub fn updated_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.is_change())
            .count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }
}

/// Applies file and directory operations idempotently.
///
/// Repeating an operation with identical input must return
/// [`Outcome::Unchanged`] and leave the filesystem as it was.
pub trait Converger {
    fn ensure_directory(&mut self, path: &Path, recursive: bool) -> Result<Outcome>;

    fn write_file(&mut self, file: &FileSpec) -> Result<Outcome>;

    /// Remove `path` if present; a missing file is not an error.
    fn delete_file(&mut self, path: &Path) -> Result<Outcome>;
}

/// Run every instruction of `plan` in order, aborting on the first error.
///
/// Files written before a failure stay on disk; re-applying the same plan
/// is the way to finish a partially converged state.
pub fn apply<C: Converger + ?Sized>(converger: &mut C, plan: &Plan) -> Result<ConvergeReport> {
    let mut report = ConvergeReport::default();

    for instruction in plan {
        debug!(%instruction, "converging");
        let outcome = match instruction {
            Instruction::EnsureDirectory { path, recursive } => {
                converger.ensure_directory(path, *recursive)?
            }
            Instruction::WriteFile(file) => converger.write_file(file)?,
            Instruction::DeleteFile { path } => converger.delete_file(path)?,
        };

        if outcome.is_change() {
            info!(path = %instruction.path().display(), ?outcome, "updated");
        }
        report.record(instruction.path(), outcome);
    }

    Ok(report)
}
