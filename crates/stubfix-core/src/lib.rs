//! Core infrastructure for stubfix.
//!
//! This crate provides the language-agnostic pieces of the stub
//! post-processing pipeline:
//! - Error types and exit codes
//! - Type-fix rules scoped to annotation contexts
//! - Unified diff reporting
//! - Modification-time snapshots for detecting generator output
//! - TOML configuration
//! - JSON report types for CLI output

pub mod config;
pub mod diff;
pub mod error;
pub mod fix;
pub mod output;
pub mod snapshot;
