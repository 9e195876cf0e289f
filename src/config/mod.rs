//! Configuration constants

pub mod defaults;
