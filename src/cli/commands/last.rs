//! `csvgrader last` command - Show the last successful import

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::history::LastImport;

pub fn run(global: &GlobalOpts) -> Result<()> {
    let path = LastImport::default_path().map_err(|e| miette::miette!("{}", e))?;
    let record = LastImport::load(&path).map_err(|e| miette::miette!("{}", e))?;

    let Some(record) = record else {
        if global.format == OutputFormat::Json {
            println!("null");
        } else {
            println!("{}", style("No imports recorded yet").dim());
        }
        return Ok(());
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            println!(
                "{}\t{}\t{}\t{}",
                record.imported_at.to_rfc3339(),
                record.target,
                record.count,
                record.summary
            );
        }
        _ => {
            println!("Last import: {}", style(&record.summary).green());
            println!("  Target:   {}", style(&record.target).cyan());
            println!("  Rows:     {}", record.count);
            println!(
                "  When:     {}",
                style(
                    record
                        .imported_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S")
                )
                .dim()
            );
        }
    }

    Ok(())
}
