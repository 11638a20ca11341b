//! Testing utilities and fixtures for confwatch.
//!
//! - **Fixtures**: a temporary host with watched files and a store directory
//! - **Assertions**: helpers for file contents and unified diffs
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use confwatch_core::Engine;
//! use confwatch_test_utils::TestHost;
//!
//! #[tokio::test]
//! async fn test_snapshot() {
//!     let host = TestHost::new().with_file("app.env", "A=1\n").build();
//!     let engine = Engine::open(host.config()).await.unwrap();
//!     engine.snapshot(&host.name("app.env"), None, false).await.unwrap();
//! }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::{assert_diff_contains, assert_file_equals};
pub use fixtures::{BuiltTestHost, TestHost};
