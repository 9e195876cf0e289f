//! Core business logic
//!
//! Manifest model, per-target build pipeline, progress aggregation,
//! bundle composition, and release publishing. Subprocess and
//! filesystem primitives live in [`crate::infra`].

pub mod archive;
pub mod compose;
pub mod manifest;
pub mod monitor;
pub mod orchestrator;
pub mod publish;
pub mod runner;
pub mod status;
