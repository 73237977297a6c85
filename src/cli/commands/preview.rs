//! `csvgrader preview` command - Show the records a CSV file parses into

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{runtime, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::parser::ParsedDataset;
use crate::core::session::read_snapshot;

#[derive(clap::Args, Debug)]
pub struct PreviewArgs {
    /// CSV file with `identifier,grade` lines
    pub file: PathBuf,
}

pub fn run(args: PreviewArgs, global: &GlobalOpts) -> Result<()> {
    let snapshot = runtime()?.block_on(read_snapshot(&args.file))?;
    print_preview(snapshot.dataset(), global.format)
}

/// Print the dataset in the requested format
pub fn print_preview(dataset: &ParsedDataset, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Auto => {
            print_stats(dataset);
            if dataset.is_empty() {
                println!("{}", style("No grade rows found").dim());
            } else {
                println!("{}", preview_table(dataset, false));
            }
        }
        OutputFormat::Md => {
            println!("{}", preview_table(dataset, true));
        }
        OutputFormat::Tsv => {
            for (i, record) in dataset.records().iter().enumerate() {
                println!("{}\t{}\t{}", i + 1, record.identifier, record.grade);
            }
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(io::stdout());
            wtr.write_record(["index", "identifier", "grade"])
                .into_diagnostic()?;
            for (i, record) in dataset.records().iter().enumerate() {
                wtr.write_record([
                    (i + 1).to_string(),
                    record.identifier.clone(),
                    record.grade.to_string(),
                ])
                .into_diagnostic()?;
            }
            wtr.flush().into_diagnostic()?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(dataset).into_diagnostic()?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn print_stats(dataset: &ParsedDataset) {
    println!(
        "  Total: {}   Pass: {}   Fail: {}",
        style(dataset.total()).magenta(),
        style(dataset.pass_count()).green(),
        style(dataset.fail_count()).red()
    );
    println!();
}

fn preview_table(dataset: &ParsedDataset, markdown: bool) -> String {
    let mut builder = Builder::default();
    builder.push_record(["#", "Identifier", "Grade"]);
    for (i, record) in dataset.records().iter().enumerate() {
        builder.push_record([
            (i + 1).to_string(),
            truncate_str(&record.identifier, 40),
            record.grade.to_string(),
        ]);
    }
    let mut table = builder.build();
    if markdown {
        table.with(Style::markdown());
    } else {
        table.with(Style::rounded());
    }
    table.to_string()
}
