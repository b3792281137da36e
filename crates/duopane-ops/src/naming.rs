//! Duplicate-avoiding names for copies.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::fs_util::{is_real_dir, path_exists};

/// Split a file name into base and extension (the extension without its dot).
///
/// Leading dots ("`.profile`") and trailing dots ("`notes.`") do not start an
/// extension. Directories never have one.
pub fn split_extension(name: &OsStr, is_dir: bool) -> (&OsStr, Option<&OsStr>) {
    if is_dir {
        return (name, None);
    }
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(extension)) if !extension.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    }
}

/// Pick a free path in `destination` for a copy of `source`.
///
/// For "`report.txt`" with suffix "` - Copy`" this tries
/// "`report - Copy.txt`", then "`report - Copy (2).txt`", "`(3)`", and so on
/// up to `max_attempts`. After that a millisecond timestamp stands in for the
/// counter.
pub fn copy_target_path(
    destination: &Path,
    source: &Path,
    suffix: &str,
    max_attempts: u32,
) -> PathBuf {
    let name = source.file_name().unwrap_or_default();
    let (base, extension) = split_extension(name, is_real_dir(source));
    let candidate = |counter: Option<u128>| {
        let mut name = OsString::from(base);
        name.push(suffix);
        if let Some(counter) = counter {
            name.push(format!(" ({counter})"));
        }
        if let Some(extension) = extension {
            name.push(".");
            name.push(extension);
        }
        destination.join(name)
    };

    let first = candidate(None);
    if !path_exists(&first) {
        return first;
    }

    for counter in 2..max_attempts {
        let path = candidate(Some(u128::from(counter)));
        if !path_exists(&path) {
            return path;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    candidate(Some(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn split(name: &str, is_dir: bool) -> (&str, Option<&str>) {
        let (base, extension) = split_extension(OsStr::new(name), is_dir);
        (base.to_str().unwrap(), extension.map(|e| e.to_str().unwrap()))
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split("a.txt", false), ("a", Some("txt")));
        assert_eq!(split("archive.tar.gz", false), ("archive.tar", Some("gz")));
        assert_eq!(split(".profile", false), (".profile", None));
        assert_eq!(split("notes.", false), ("notes.", None));
        assert_eq!(split("Makefile", false), ("Makefile", None));
        assert_eq!(split("photos.2024", true), ("photos.2024", None));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_kept_byte_for_byte() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let source = dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        fs::write(&source, b"c").unwrap();

        let target = copy_target_path(dir.path(), &source, " - Copy", 10_000);
        assert_eq!(
            target.file_name().unwrap().as_bytes(),
            b"caf\xe9 - Copy.txt"
        );
    }

    #[test]
    fn test_first_copy_name() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"a").unwrap();

        let target = copy_target_path(dir.path(), &source, " - Copy", 10_000);
        assert_eq!(target, dir.path().join("a - Copy.txt"));
    }

    #[test]
    fn test_counter_starts_at_two() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"a").unwrap();
        fs::write(dir.path().join("a - Copy.txt"), b"first copy").unwrap();

        let target = copy_target_path(dir.path(), &source, " - Copy", 10_000);
        assert_eq!(target, dir.path().join("a - Copy (2).txt"));

        fs::write(&target, b"second copy").unwrap();
        let target = copy_target_path(dir.path(), &source, " - Copy", 10_000);
        assert_eq!(target, dir.path().join("a - Copy (3).txt"));
    }

    #[test]
    fn test_directory_keeps_dotted_name() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("v1.2");
        fs::create_dir(&source).unwrap();

        let target = copy_target_path(dir.path(), &source, " - Copy", 10_000);
        assert_eq!(target, dir.path().join("v1.2 - Copy"));
    }

    #[test]
    fn test_timestamp_fallback_when_attempts_exhausted() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"a").unwrap();
        fs::write(dir.path().join("a - Copy.txt"), b"1").unwrap();
        fs::write(dir.path().join("a - Copy (2).txt"), b"2").unwrap();

        let target = copy_target_path(dir.path(), &source, " - Copy", 3);
        let name = target.file_name().unwrap().to_string_lossy().into_owned();

        assert!(name.starts_with("a - Copy ("));
        assert!(name.ends_with(").txt"));
        assert_ne!(name, "a - Copy (2).txt");
        assert!(!target.exists());
    }
}
