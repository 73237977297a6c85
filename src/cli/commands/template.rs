//! `csvgrader template` command - Print an example grades CSV

use console::style;
use miette::Result;

/// One `identifier,grade` pair per line, no header row
const EXAMPLE_ROWS: &[(&str, &str)] = &[("alice", "1"), ("bob", "0.5"), ("carol", "0")];

pub fn run() -> Result<()> {
    // Output to stdout (can be redirected to file)
    for (identifier, grade) in EXAMPLE_ROWS {
        println!("{},{}", identifier, grade);
    }

    // Print usage hint to stderr so it doesn't interfere with redirected output
    eprintln!();
    eprintln!(
        "{} Template generated. Redirect to file: csvgrader template > grades.csv",
        style("→").blue()
    );

    Ok(())
}
