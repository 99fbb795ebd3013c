//! Converger for the local filesystem.

use super::{Converger, FileSpec, Outcome};
use crate::error::{ConsulRenderError, Result};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{chown, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Permission bits compared against a file's desired mode.
const MODE_MASK: u32 = 0o7777;

/// Applies instructions to the real filesystem.
///
/// Content changes go through a temporary file in the target directory that
/// is synced and renamed over the target, so readers never observe a
/// half-written file. Metadata-only drift (mode, owner, group) is fixed in
/// place without rewriting content. A symlinked target is written through:
/// the link stays and the file it points to is converged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalConverger;

impl LocalConverger {
    pub fn new() -> Self {
        Self
    }
}

fn resolve_uid(owner: &str) -> Result<u32> {
    uzers::get_user_by_name(owner)
        .map(|user| user.uid())
        .ok_or_else(|| ConsulRenderError::UnknownOwner(owner.to_string()))
}

fn resolve_gid(group: &str) -> Result<u32> {
    uzers::get_group_by_name(group)
        .map(|group| group.gid())
        .ok_or_else(|| ConsulRenderError::UnknownGroup(group.to_string()))
}

fn metadata_if_exists(path: &Path) -> Result<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConsulRenderError::filesystem(path, e)),
    }
}

/// The path a write must land on: `path` itself, or the file a symlink at
/// `path` points to. A dangling link resolves to its (not yet existing) target.
fn resolve_target(path: &Path) -> Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {}
        Ok(_) => return Ok(path.to_path_buf()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(path.to_path_buf()),
        Err(e) => return Err(ConsulRenderError::filesystem(path, e)),
    }

    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let link = fs::read_link(path).map_err(|e| ConsulRenderError::filesystem(path, e))?;
            Ok(parent_dir(path).join(link))
        }
        Err(e) => Err(ConsulRenderError::filesystem(path, e)),
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Flush directory entries of `dir`, making a completed rename durable.
fn sync_directory(dir: &Path) -> Result<()> {
    fs::File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(|e| ConsulRenderError::filesystem(dir, e))
}

/// Write `content` next to `target` and rename it into place.
fn write_atomically(file: &FileSpec, target: &Path, uid: u32, gid: u32) -> Result<()> {
    let dir = parent_dir(target);
    let fs_err = |e: io::Error| ConsulRenderError::filesystem(target, e);

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ConsulRenderError::filesystem(dir, e))?;
    temp.write_all(file.content.as_bytes()).map_err(fs_err)?;
    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(file.mode))
        .map_err(fs_err)?;
    chown(temp.path(), Some(uid), Some(gid)).map_err(fs_err)?;
    temp.as_file().sync_all().map_err(fs_err)?;
    temp.persist(target).map_err(|e| fs_err(e.error))?;
    sync_directory(dir)
}

impl Converger for LocalConverger {
    fn ensure_directory(&mut self, path: &Path, recursive: bool) -> Result<Outcome> {
        match metadata_if_exists(path)? {
            Some(meta) if meta.is_dir() => return Ok(Outcome::Unchanged),
            Some(_) => {
                return Err(ConsulRenderError::filesystem(
                    path,
                    io::Error::new(io::ErrorKind::AlreadyExists, "exists and is not a directory"),
                ))
            }
            None => {}
        }

        let created = if recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        };
        created.map_err(|e| ConsulRenderError::filesystem(path, e))?;
        Ok(Outcome::Created)
    }

    fn write_file(&mut self, file: &FileSpec) -> Result<Outcome> {
        let uid = resolve_uid(&file.owner)?;
        let gid = resolve_gid(&file.group)?;
        let target = resolve_target(&file.path)?;
        let path = target.as_path();

        let Some(meta) = metadata_if_exists(path)? else {
            write_atomically(file, path, uid, gid)?;
            return Ok(Outcome::Created);
        };
        if meta.is_dir() {
            return Err(ConsulRenderError::filesystem(
                path,
                io::Error::other("expected a file, found a directory"),
            ));
        }

        let current = fs::read(path).map_err(|e| ConsulRenderError::filesystem(path, e))?;
        if current != file.content.as_bytes() {
            if file.sensitive {
                debug!(path = %path.display(), "content differs (sensitive)");
            } else {
                debug!(
                    path = %path.display(),
                    from = %format!("{:x}", md5::compute(&current)),
                    to = %file.digest().unwrap_or_default(),
                    "content differs"
                );
            }
            write_atomically(file, path, uid, gid)?;
            return Ok(Outcome::Updated);
        }

        let mut outcome = Outcome::Unchanged;
        if meta.permissions().mode() & MODE_MASK != file.mode {
            debug!(
                path = %path.display(),
                from = %format!("{:04o}", meta.permissions().mode() & MODE_MASK),
                to = %format!("{:04o}", file.mode),
                "mode differs"
            );
            fs::set_permissions(path, fs::Permissions::from_mode(file.mode))
                .map_err(|e| ConsulRenderError::filesystem(path, e))?;
            outcome = Outcome::Updated;
        }
        if meta.uid() != uid || meta.gid() != gid {
            debug!(path = %path.display(), owner = %file.owner, group = %file.group, "ownership differs");
            chown(path, Some(uid), Some(gid)).map_err(|e| ConsulRenderError::filesystem(path, e))?;
            outcome = Outcome::Updated;
        }
        Ok(outcome)
    }

    fn delete_file(&mut self, path: &Path) -> Result<Outcome> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => Err(ConsulRenderError::filesystem(
                path,
                io::Error::other("refusing to delete a directory"),
            )),
            Ok(_) => {
                fs::remove_file(path).map_err(|e| ConsulRenderError::filesystem(path, e))?;
                Ok(Outcome::Removed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Outcome::Unchanged),
            Err(e) => Err(ConsulRenderError::filesystem(path, e)),
        }
    }
}
