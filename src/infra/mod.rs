//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, subprocesses and
//! source checkout. This module is the only place where side effects occur.

pub mod download;
pub mod filesystem;
pub mod process;
pub mod source;
