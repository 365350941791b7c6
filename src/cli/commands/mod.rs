//! CLI command implementations.

pub mod idea;
pub mod profile;
