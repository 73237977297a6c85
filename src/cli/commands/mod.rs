//! CLI command implementations

pub mod completions;
pub mod config;
pub mod import;
pub mod last;
pub mod preview;
pub mod targets;
pub mod template;
