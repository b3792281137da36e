//! Deletion that works around read-only attributes and locked parents.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// One way of removing a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStrategy {
    /// Plain remove.
    Plain,
    /// Clear the read-only attribute on the path, then remove.
    ClearReadOnly,
    /// Make the parent directory writable, then remove.
    UnlockParent,
}

/// Strategies tried in order by [`force_remove`].
pub const DELETE_LADDER: [DeleteStrategy; 3] = [
    DeleteStrategy::Plain,
    DeleteStrategy::ClearReadOnly,
    DeleteStrategy::UnlockParent,
];

/// Remove a file, symlink or empty directory, retrying through
/// [`DELETE_LADDER`] on permission errors.
///
/// Returns the first success. If every strategy fails, the original
/// permission error is returned. Other errors are returned immediately.
pub fn force_remove(path: &Path) -> io::Result<()> {
    run_ladder(&DELETE_LADDER, |strategy| apply(strategy, path))
}

/// Remove a directory and everything below it with [`force_remove`].
///
/// Children are removed before their parent. A missing root is not an error.
pub fn force_remove_tree(root: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if !metadata.is_dir() {
        return force_remove(root);
    }

    for entry in walkdir::WalkDir::new(root).contents_first(true) {
        let entry = entry.map_err(io::Error::from)?;
        force_remove(entry.path())?;
    }
    Ok(())
}

pub(crate) fn run_ladder<F>(strategies: &[DeleteStrategy], mut attempt: F) -> io::Result<()>
where
    F: FnMut(DeleteStrategy) -> io::Result<()>,
{
    let mut original: Option<io::Error> = None;

    for &strategy in strategies {
        match attempt(strategy) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                debug!("Delete strategy {strategy:?} denied: {e}");
                original.get_or_insert(e);
            }
            Err(e) => return Err(original.unwrap_or(e)),
        }
    }

    Err(original.unwrap_or_else(|| io::Error::other("no delete strategy configured")))
}

fn apply(strategy: DeleteStrategy, path: &Path) -> io::Result<()> {
    match strategy {
        DeleteStrategy::Plain => remove(path),
        DeleteStrategy::ClearReadOnly => {
            let metadata = fs::symlink_metadata(path)?;
            if !metadata.file_type().is_symlink() {
                let mut permissions = metadata.permissions();
                make_writable(&mut permissions);
                fs::set_permissions(path, permissions)?;
            }
            remove(path)
        }
        DeleteStrategy::UnlockParent => {
            let Some(parent) = path.parent() else {
                return remove(path);
            };
            let before = fs::metadata(parent)?.permissions();
            let mut unlocked = before.clone();
            make_writable(&mut unlocked);
            fs::set_permissions(parent, unlocked)?;

            let result = remove(path);
            if let Err(e) = fs::set_permissions(parent, before) {
                debug!("Could not restore permissions on {}: {e}", parent.display());
            }
            result
        }
    }
}

fn remove(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(permissions: &mut fs::Permissions) {
    permissions.set_readonly(false);
}
