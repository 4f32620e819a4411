//! Shared test utilities for the pokedex-ingest workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A scripted [`HttpTransport`](dex_common::HttpTransport) with call logs
//! - In-memory asset and record stores
//! - JSON fixtures shaped like the catalog and detail endpoints
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, Reply, ScriptedTransport};
//! ```

pub mod fixtures;
pub mod stores;
pub mod transport;

// Re-export commonly used items at the crate root
pub use stores::{MemoryAssetStore, MemoryRecordStore};
pub use transport::{Reply, ScriptedTransport};

/// Macro to skip a test if an environment variable is not set.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_env;
///
/// #[tokio::test]
/// async fn test_against_live_api() {
///     let base = require_env!("LIVE_CATALOG_URL");
///     // Test code using base...
/// }
/// ```
#[macro_export]
macro_rules! require_env {
    ($name:expr) => {{
        match std::env::var($name) {
            Ok(value) => value,
            Err(_) => {
                eprintln!("SKIPPED: environment variable '{}' not set.", $name);
                return;
            }
        }
    }};
}
