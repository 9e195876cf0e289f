//! Nightbuild - nightly cross-platform build and release orchestrator
//!
//! Builds a project for several declared targets in parallel, merges
//! the successful builds into distributable install bundles, and
//! publishes them to a revision-addressed release store with a floating
//! `latest` alias.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic (manifest, runners, compose, publish)
//! - [`infra`] - Infrastructure layer (processes, downloads, filesystem, source)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
