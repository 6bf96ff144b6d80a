//! Common types and utilities shared across the engine.
//!
//! This module provides the unified error type and the little-endian and
//! UTF-16 helpers every on-disk structure is read and written with.

// Submodule declarations
pub mod binary;
pub mod error;

// Re-exports for convenience
pub use error::{Error, Result};
