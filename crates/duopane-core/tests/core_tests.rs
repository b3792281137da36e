use duopane_core::{EngineConfig, OpError, ValidationError};
use std::path::{Path, PathBuf};

#[test]
fn test_config_round_trips_through_json() {
    let config = EngineConfig::builder()
        .workers(3usize)
        .backup_budget(None)
        .audit_log(Some(PathBuf::from("/tmp/audit.jsonl")))
        .build()
        .unwrap();

    let json = serde_json::to_string(&config).unwrap();
    let parsed: EngineConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.workers, 3);
    assert_eq!(parsed.backup_budget, None);
    assert_eq!(parsed.audit_log_path(), PathBuf::from("/tmp/audit.jsonl"));
}

#[test]
fn test_default_audit_log_location() {
    let config = EngineConfig::default();
    let path = config.audit_log_path();

    assert!(path.ends_with(Path::new("duopane").join("history.jsonl")));
}

#[test]
fn test_validation_errors_become_op_errors() {
    let err: OpError = ValidationError::SameFolder.into();

    assert!(matches!(err, OpError::Validation(ValidationError::SameFolder)));
    assert!(!err.is_permission());
    assert!(!err.is_cancelled());
    assert_eq!(err.to_string(), "Cannot move files to the same folder");
}

#[test]
fn test_locked_error_keeps_permission_cause() {
    let err = OpError::Locked {
        path: PathBuf::from("/data/locked.bin"),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    };

    assert!(err.is_permission());
    assert!(
        err.user_message(Some(Path::new("/data")))
            .contains("Cannot write to folder")
    );
}

#[test]
fn test_non_permission_errors_keep_their_own_message() {
    let err = OpError::io(
        "/data/file.txt",
        std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
    );

    assert_eq!(
        err.user_message(Some(Path::new("/data"))),
        "File not found: /data/file.txt"
    );
}
