//! Common utilities and types shared across conn-check components.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for the result vocabulary (status and outcome)
pub mod types;

/// Module for environment-driven configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;
