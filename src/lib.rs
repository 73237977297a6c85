//! csvgrader: CSV grade importer
//!
//! Parses `identifier,grade` CSV files into grade records, previews them,
//! and submits them to a remote grading endpoint, reporting what happened
//! to each row.

pub mod cli;
pub mod core;
