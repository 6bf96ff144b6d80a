//! Unified error types for the compound file engine.
//!
//! This module provides the single error type returned by every fallible
//! operation in the crate.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
