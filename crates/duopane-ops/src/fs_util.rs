//! Small filesystem helpers shared by the operations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

/// Whether anything (including a dangling symlink) exists at `path`.
pub(crate) fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Whether `path` is a directory (not following a final symlink).
pub(crate) fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}

/// Whether `path` is writable according to its permission bits.
pub(crate) fn is_writable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| !m.permissions().readonly())
}

/// `path` with `..` and symlinks resolved, or as given when it cannot be.
pub(crate) fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Whether `path` is `dir` itself or lies somewhere below it.
pub(crate) fn is_within(path: &Path, dir: &Path) -> bool {
    resolved(path).starts_with(resolved(dir))
}

/// Display name of the last path component.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Count the files under `sources` (a file source counts as one).
///
/// Directories are walked in parallel. Any unreadable entry fails the count
/// so the caller can fall back to a coarse total.
pub(crate) fn count_files(sources: &[PathBuf]) -> io::Result<usize> {
    let mut count = 0;

    for source in sources {
        if !is_real_dir(source) {
            count += 1;
            continue;
        }

        for entry in WalkDir::new(source).skip_hidden(false).follow_links(false) {
            let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
            if !entry.file_type().is_dir() {
                count += 1;
            }
        }
    }

    Ok(count)
}

/// Copy a file or symlink, keeping permissions and modification time.
///
/// Returns the number of bytes copied.
pub(crate) fn copy_file_preserving(source: &Path, dest: &Path) -> io::Result<u64> {
    let metadata = fs::symlink_metadata(source)?;

    if metadata.file_type().is_symlink() {
        let target = fs::read_link(source)?;
        crate::backup::Backup::Symlink(target).restore(dest)?;
        return Ok(0);
    }

    let bytes = fs::copy(source, dest)?;

    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    let atime = filetime::FileTime::from_last_access_time(&metadata);
    if let Err(e) = filetime::set_file_times(dest, atime, mtime) {
        tracing::debug!("Could not preserve timestamps on {}: {e}", dest.display());
    }

    Ok(bytes)
}

/// Move a file or directory, falling back to copy and remove when a rename
/// cannot cross devices.
pub(crate) fn move_item(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                "Rename across devices, copying {} to {}",
                source.display(),
                dest.display()
            );
            if is_real_dir(source) {
                copy_tree(source, dest)?;
                crate::force_delete::force_remove_tree(source)
            } else {
                copy_file_preserving(source, dest)?;
                crate::force_delete::force_remove(source)
            }
        }
        Err(e) => Err(e),
    }
}

fn copy_tree(source: &Path, dest: &Path) -> io::Result<()> {
    for entry in walkdir::WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_file_preserving(entry.path(), &target)?;
        }
    }
    Ok(())
}
