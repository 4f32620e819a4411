//! Tests for the error taxonomy's messages and conversions.

use dex_common::{AssetError, FetchCause, FetchError, PersistenceError, StoreError};

fn fetch_error(cause: FetchCause) -> FetchError {
    FetchError {
        url: "https://pokeapi.co/api/v2/pokemon/1/".to_string(),
        attempts: 4,
        cause,
    }
}

// ============================================================================
// FetchError
// ============================================================================

#[test]
fn test_fetch_error_reports_attempts_and_status() {
    let err = fetch_error(FetchCause::Status(503));
    let message = err.to_string();
    assert!(message.contains("https://pokeapi.co/api/v2/pokemon/1/"));
    assert!(message.contains("4 attempt(s)"));
    assert!(message.contains("503"));
}

#[test]
fn test_fetch_error_reports_transport_cause() {
    let err = fetch_error(FetchCause::Transport("connection reset".to_string()));
    assert!(err.to_string().contains("connection reset"));
}

// ============================================================================
// AssetError
// ============================================================================

#[test]
fn test_asset_error_wraps_fetch_error() {
    let err: AssetError = fetch_error(FetchCause::Status(404)).into();
    match &err {
        AssetError::Fetch(inner) => assert_eq!(inner.cause, FetchCause::Status(404)),
        other => panic!("unexpected variant: {other:?}"),
    }
    assert!(err.to_string().starts_with("asset download failed"));
}

#[test]
fn test_asset_error_store_names_key() {
    let err = AssetError::Store {
        key: "25.png".to_string(),
        source: StoreError::InvalidKey("25.png".to_string()),
    };
    assert!(err.to_string().contains("25.png"));
}

// ============================================================================
// PersistenceError
// ============================================================================

#[test]
fn test_persistence_error_from_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: PersistenceError = json_err.into();
    assert!(matches!(err, PersistenceError::Decode(_)));
}
