//! Tests for configuration validation

use std::path::PathBuf;

use attempt_ledger::config::{LedgerConfig, PersistenceBackendConfig};

#[test]
fn test_default_config_is_valid() {
    let cfg = LedgerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.persistence, PersistenceBackendConfig::InMemory);
    assert!(cfg.audit_buffer_events > 0);
}

#[test]
fn test_file_backend_requires_path() {
    let cfg = LedgerConfig {
        persistence: PersistenceBackendConfig::File {
            path: PathBuf::new(),
        },
        ..LedgerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let cfg = LedgerConfig::from_json_str(
        r#"{
            "audit_buffer_events": 0,
            "show_requests": true,
            "persistence": { "kind": "file", "path": "/var/lib/ledger" }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.audit_buffer_events, 0);
    assert!(cfg.show_requests);
    assert_eq!(
        cfg.persistence,
        PersistenceBackendConfig::File {
            path: PathBuf::from("/var/lib/ledger")
        }
    );
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = LedgerConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, LedgerConfig::default());
}

#[test]
fn test_from_json_str_rejects_bad_input() {
    let err = LedgerConfig::from_json_str("{\"audit_buffer_events\": -1}").unwrap_err();
    assert!(err.starts_with("parse error"));
    let err = LedgerConfig::from_json_str(r#"{"persistence": {"kind": "file", "path": ""}}"#)
        .unwrap_err();
    assert!(err.contains("non-empty path"));
}

#[test]
fn test_store_path_selects_file_backend() {
    let cfg = LedgerConfig::from_lookup(|key| {
        (key == "LEDGER_STORE_PATH").then(|| "/tmp/ledger-store".to_string())
    })
    .unwrap();
    assert_eq!(
        cfg.persistence,
        PersistenceBackendConfig::File {
            path: PathBuf::from("/tmp/ledger-store")
        }
    );
}

#[test]
fn test_bad_buffer_size_is_reported() {
    let err = LedgerConfig::from_lookup(|key| {
        (key == "LEDGER_AUDIT_BUFFER_EVENTS").then(|| "lots".to_string())
    })
    .unwrap_err();
    assert!(err.to_string().contains("LEDGER_AUDIT_BUFFER_EVENTS"));
}
