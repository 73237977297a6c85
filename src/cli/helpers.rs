//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::Term;
use log::LevelFilter;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;

/// Initialize logging from the global flags.
///
/// `--verbose` shows debug output for this crate, `--quiet` only errors.
/// `RUST_LOG` still overrides both.
pub fn init_logging(global: &GlobalOpts) {
    let level = if global.verbose {
        LevelFilter::Debug
    } else if global.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };

    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("csvgrader", level)
        .parse_default_env()
        .format_timestamp_secs()
        .format_target(false)
        .try_init();
}

/// Build the single-threaded runtime that drives file reads and the import call
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()
}

/// Whether prompts can be shown
pub fn is_interactive() -> bool {
    Term::stdout().is_term() && Term::stderr().is_term()
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
