//! Infrastructure layer - external integrations and utilities.
//!
//! This module contains code that interfaces with external systems:
//! - Filesystem helpers (canonical paths, atomic writes, tolerant removal)
//! - Error types

pub mod error;
pub mod filesystem;
