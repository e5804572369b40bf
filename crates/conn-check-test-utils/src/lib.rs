//! # Connectivity Check Test Utilities
//!
//! Shared fixtures for the `conn-check` integration tests.
//!
//! This crate provides:
//! - TCP fixtures (`TestListener`, `closed_port`) for reachability and gate tests
//! - Environment builder (`EnvBuilder`) producing `EnvSnapshot`s without touching the process env
//! - Scripted checks (`ScriptedCheck`) for runner tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conn_check_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let listener = TestListener::spawn().await;
//!     let env = EnvBuilder::new()
//!         .enable("ENABLE_POSTGRES")
//!         .set("POSTGRES_HOST", "127.0.0.1")
//!         .set("POSTGRES_PORT", listener.port().to_string())
//!         .build();
//!     // ...
//! }
//! ```

pub mod env_builder;
pub mod scripted_check;
pub mod tcp_fixtures;

// Re-export commonly used items
pub use env_builder::*;
pub use scripted_check::*;
pub use tcp_fixtures::*;
