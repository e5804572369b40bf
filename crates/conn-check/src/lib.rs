//! Connectivity Check Library
//!
//! Verifies that the backing services of a development environment are up
//! and usable from Rust: each enabled service gets a TCP reachability check
//! followed by a real write/read/delete round trip through a native client.
//!
//! # Flow
//!
//! ```text
//! EnvSnapshot -> checks::registry() -> Runner -> gate -> reachability -> client round trip
//!                                        |
//!                                        +-> report (PASS / FAIL / SKIP lines, summary, exit code)
//! ```
//!
//! # Modules
//!
//! - `reachability` - Bounded TCP port polling
//! - `gate` - Enable-flag and reachability pre-check shared by every service
//! - `checks` - Per-service round trips and the check registry
//! - `report` - Console line formatting and totals
//! - `runner` - Sequential execution with error and panic isolation

pub mod checks;
pub mod gate;
pub mod reachability;
pub mod report;
pub mod runner;
