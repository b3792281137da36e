use duopane_core::{EngineConfig, OpError, ValidationError};
use duopane_ops::{
    CancelFlag, InlineDispatcher, Operation, OperationContext, OperationFactory, OperationRequest,
    ProgressCallback, ProgressReporter, ProgressSlot, execute, force_remove,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

type Snapshot = BTreeMap<PathBuf, Option<Vec<u8>>>;

/// Relative path to file contents (None for folders).
fn snapshot(root: &Path) -> Snapshot {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.unwrap())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            let contents = if entry.file_type().is_dir() {
                None
            } else {
                Some(fs::read(entry.path()).unwrap())
            };
            (relative, contents)
        })
        .collect()
}

fn sample_tree(root: &Path) {
    fs::create_dir_all(root.join("docs/drafts")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("readme.txt"), b"hello").unwrap();
    fs::write(root.join("docs/a.md"), b"# a").unwrap();
    fs::write(root.join("docs/b.md"), b"# b").unwrap();
    fs::write(root.join("docs/drafts/c.md"), b"draft").unwrap();
}

fn ctx() -> OperationContext {
    OperationContext::detached(EngineConfig::default())
}

fn build(request: OperationRequest) -> Operation {
    OperationFactory::create(request)
}

/// Raises the cancel flag as soon as the first item is reported.
struct CancelAfterFirst(CancelFlag);

impl ProgressCallback for CancelAfterFirst {
    fn on_progress(&self, _current: usize, _total: usize, _current_item: &str) {
        self.0.cancel();
    }

    fn on_status_change(&self, _status: &str) {}
}

fn cancelling_ctx() -> OperationContext {
    let ctx = ctx();
    let cancel = ctx.cancel_flag().clone();
    let slot = ProgressSlot::default();
    slot.set(Some(Arc::new(CancelAfterFirst(cancel.clone()))));
    let reporter = ProgressReporter::new(slot, Arc::new(InlineDispatcher), cancel);
    ctx.with_reporter(reporter)
}

#[test]
fn test_copy_produces_identical_tree_and_undo_restores_destination() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("project");
    let dst = dir.path().join("backup");
    sample_tree(&src);
    fs::create_dir_all(dst.join("project/docs")).unwrap();
    fs::write(dst.join("project/docs/a.md"), b"older a").unwrap();
    fs::write(dst.join("unrelated.txt"), b"keep me").unwrap();
    let before = snapshot(&dst);

    let mut op = build(OperationRequest::copy(vec![src.clone()], dst.clone(), false));
    let result = execute(&mut op, &ctx());
    assert!(result.is_success(), "{}", result.message());
    assert_eq!(snapshot(&dst.join("project")), snapshot(&src));

    op.undo(&ctx()).unwrap();
    assert_eq!(snapshot(&dst), before);
}

#[test]
fn test_copy_into_folder_with_same_named_file() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    let d = dir.path().join("D");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&d).unwrap();
    fs::write(src.join("x.txt"), b"new x").unwrap();
    fs::write(src.join("y.txt"), b"new y").unwrap();
    fs::write(d.join("x.txt"), b"original x").unwrap();

    let mut op = build(OperationRequest::copy(
        vec![src.join("x.txt"), src.join("y.txt")],
        d.clone(),
        false,
    ));
    assert!(execute(&mut op, &ctx()).is_success());
    assert_eq!(fs::read(d.join("x.txt")).unwrap(), b"new x");
    assert_eq!(fs::read(d.join("y.txt")).unwrap(), b"new y");

    op.undo(&ctx()).unwrap();
    assert_eq!(fs::read(d.join("x.txt")).unwrap(), b"original x");
    assert!(!d.join("y.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_copy_that_cannot_read_source_keeps_existing_file() {
    use std::os::unix::net::UnixListener;

    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    let d = dir.path().join("D");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&d).unwrap();
    fs::write(d.join("x.txt"), b"original x").unwrap();
    let _socket = UnixListener::bind(src.join("x.txt")).unwrap();
    let before = snapshot(&d);

    let mut op = build(OperationRequest::copy(vec![src.join("x.txt")], d.clone(), false));
    let result = execute(&mut op, &ctx());

    assert!(!result.is_success());
    assert!(matches!(result.error(), Some(OpError::Io { .. })));
    assert_eq!(snapshot(&d), before);
}

#[test]
fn test_copy_into_itself_through_dotted_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("src");
    sample_tree(&root);
    fs::create_dir(dir.path().join("other")).unwrap();
    let before = snapshot(dir.path());

    let mut op = build(OperationRequest::copy(
        vec![dir.path().join("other/../src")],
        root.join("docs"),
        false,
    ));
    let result = execute(&mut op, &ctx());

    assert!(matches!(
        result.error(),
        Some(OpError::Validation(ValidationError::IntoItself(_)))
    ));
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_copy_suffix_counter() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("a - Copy.txt"), b"first").unwrap();

    let mut op = build(OperationRequest::copy(
        vec![dir.path().join("a.txt")],
        dir.path().to_path_buf(),
        true,
    ));
    assert!(execute(&mut op, &ctx()).is_success());

    assert_eq!(fs::read(dir.path().join("a - Copy (2).txt")).unwrap(), b"a");
    assert_eq!(fs::read(dir.path().join("a - Copy.txt")).unwrap(), b"first");
}

#[test]
fn test_delete_undo_restores_exact_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    sample_tree(&root);
    let before = snapshot(dir.path());

    let mut op = build(OperationRequest::delete(vec![root.clone()]));
    assert!(execute(&mut op, &ctx()).is_success());
    assert!(!root.exists());

    let outcome = op.undo(&ctx()).unwrap();
    assert!(outcome.is_complete());
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_delete_undo_skips_oversized_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    sample_tree(&root);
    fs::write(root.join("docs/huge.iso"), vec![1u8; 4096]).unwrap();
    let config = EngineConfig::builder()
        .backup_size_limit(1024u64)
        .build()
        .unwrap();
    let ctx = OperationContext::detached(config);

    let mut op = build(OperationRequest::delete(vec![root.clone()]));
    assert!(execute(&mut op, &ctx).is_success());

    let outcome = op.undo(&ctx).unwrap();
    assert_eq!(outcome.unrecoverable, vec![root.join("docs/huge.iso")]);
    assert!(!root.join("docs/huge.iso").exists());
    sample_tree_matches(&root);
}

fn sample_tree_matches(root: &Path) {
    let expected = {
        let scratch = TempDir::new().unwrap();
        sample_tree(scratch.path());
        snapshot(scratch.path())
    };
    assert_eq!(snapshot(root), expected);
}

#[test]
fn test_move_undo_restores_items_still_present() {
    let dir = TempDir::new().unwrap();
    let from = dir.path().join("from");
    let to = dir.path().join("to");
    sample_tree(&from);
    fs::create_dir(&to).unwrap();

    let mut op = build(OperationRequest::move_to(
        vec![from.join("docs"), from.join("readme.txt"), from.join("empty")],
        to.clone(),
    ));
    assert!(execute(&mut op, &ctx()).is_success());
    assert!(to.join("docs/drafts/c.md").exists());

    fs::remove_dir(to.join("empty")).unwrap();
    op.undo(&ctx()).unwrap();

    assert_eq!(fs::read(from.join("docs/drafts/c.md")).unwrap(), b"draft");
    assert_eq!(fs::read(from.join("readme.txt")).unwrap(), b"hello");
    assert!(!from.join("empty").exists());
    assert!(snapshot(&to).is_empty());
}

#[test]
fn test_cancelled_copy_leaves_whole_files_only() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    let dst = dir.path().join("dst");
    sample_tree(&src);
    fs::create_dir(&dst).unwrap();
    let ctx = cancelling_ctx();

    let mut op = build(OperationRequest::copy(vec![src.clone()], dst.clone(), false));
    let result = execute(&mut op, &ctx);
    assert!(result.is_cancelled());
    assert_eq!(result.message(), "Operation cancelled by user");

    let copied = snapshot(&dst.join("src"));
    let source = snapshot(&src);
    let files: Vec<_> = copied.iter().filter(|(_, c)| c.is_some()).collect();
    assert_eq!(files.len(), 1);
    for (path, contents) in copied {
        assert_eq!(source.get(&path), Some(&contents));
    }

    op.undo(&ctx).unwrap();
    assert!(snapshot(&dst).is_empty());
}

#[test]
fn test_cancelled_move_keeps_moved_items() {
    let dir = TempDir::new().unwrap();
    let from = dir.path().join("from");
    let to = dir.path().join("to");
    sample_tree(&from);
    fs::create_dir(&to).unwrap();
    let ctx = cancelling_ctx();

    let mut op = build(OperationRequest::move_to(
        vec![from.join("docs"), from.join("readme.txt")],
        to.clone(),
    ));
    let result = execute(&mut op, &ctx);
    assert!(result.is_cancelled());

    assert!(to.join("docs/a.md").exists());
    assert!(from.join("readme.txt").exists());
    assert!(!to.join("readme.txt").exists());
}

#[test]
fn test_cancelled_delete_can_be_undone() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    sample_tree(&root);
    let before = snapshot(dir.path());
    let ctx = cancelling_ctx();

    let mut op = build(OperationRequest::delete(vec![root.clone()]));
    let result = execute(&mut op, &ctx);
    assert!(result.is_cancelled());
    assert!(root.join("readme.txt").exists());

    op.undo(&ctx).unwrap();
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_validation_never_mutates() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    sample_tree(&root);
    let before = snapshot(dir.path());

    let requests = [
        OperationRequest::copy(vec![root.join("docs")], root.clone(), true),
        OperationRequest::copy(vec![root.clone()], root.join("docs"), false),
        OperationRequest::move_to(vec![root.join("readme.txt")], root.join("docs")),
        OperationRequest::delete(vec![root.clone()]),
        OperationRequest::create_folder(root.join("fresh")),
        OperationRequest::rename(root.join("readme.txt"), root.join("README")),
    ];

    for request in requests {
        let _ = build(request).validate();
    }
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_validation_failure_result() {
    let dir = TempDir::new().unwrap();
    let mut op = build(OperationRequest::move_to(
        vec![dir.path().join("ghost.txt")],
        dir.path().join("nowhere"),
    ));

    let result = execute(&mut op, &ctx());
    assert!(!result.is_success());
    assert!(matches!(
        result.error(),
        Some(OpError::Validation(ValidationError::SourceMissing(_)))
    ));
    assert!(op.validation_error().is_some());
    assert!(op.is_executed());
}

#[cfg(unix)]
#[test]
fn test_force_remove_in_read_only_folder_restores_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    let file = locked.join("inside.txt");
    fs::write(&file, b"x").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    force_remove(&file).unwrap();

    assert!(!file.exists());
    let mode = fs::metadata(&locked).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o555);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}
