//! CLI command implementations.

pub mod catalog;
pub mod project;
pub mod provision;
pub mod serve;
