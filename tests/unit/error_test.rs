//! Tests for error types

use attempt_ledger::core::{LedgerError, TokenError};
use attempt_ledger::util::{ApplicationId, AttemptId, ContainerId, NodeId};

#[test]
fn test_token_error_display() {
    let err = TokenError::Unresolvable {
        node: NodeId::new("n9", 8041),
        reason: "unknown host".into(),
    };
    assert_eq!(err.to_string(), "cannot resolve node n9:8041: unknown host");
    assert_eq!(
        TokenError::Issuer("no key".into()).to_string(),
        "token issuer error: no key"
    );
}

#[test]
fn test_token_error_is_transparent_in_ledger_error() {
    let err: LedgerError = TokenError::Issuer("no key".into()).into();
    assert_eq!(err.to_string(), "token issuer error: no key");
    assert!(matches!(err, LedgerError::Token(TokenError::Issuer(_))));
}

#[test]
fn test_ledger_error_display() {
    let attempt = AttemptId::new(ApplicationId::new(1_700_000_000_000, 12), 2);
    assert_eq!(
        LedgerError::AttemptInUse(attempt).to_string(),
        "attempt appattempt_1700000000000_0012_000002 is still in use"
    );
    assert_eq!(
        LedgerError::UnknownContainer(ContainerId::new(attempt, 5)).to_string(),
        "unknown container container_1700000000000_0012_02_000005"
    );
    assert_eq!(
        LedgerError::Persistence("disk full".into()).to_string(),
        "persistence error: disk full"
    );
}

#[test]
fn test_io_and_serde_conversions() {
    let io: LedgerError = std::io::Error::other("boom").into();
    assert!(matches!(io, LedgerError::Io(_)));
    let serde: LedgerError = serde_json::from_str::<u32>("x").unwrap_err().into();
    assert!(matches!(serde, LedgerError::Serde(_)));
}
