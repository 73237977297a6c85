//! `csvgrader targets` command - List configured target blocks

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

pub fn run(global: &GlobalOpts) -> Result<()> {
    let config = Config::load_from(global.config.as_deref());

    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config.targets).into_diagnostic()?
            );
        }
        OutputFormat::Tsv | OutputFormat::Csv => {
            let sep = if global.format == OutputFormat::Tsv { '\t' } else { ',' };
            for target in &config.targets {
                println!("{}{}{}", target.id, sep, target.name.as_deref().unwrap_or(""));
            }
        }
        OutputFormat::Auto | OutputFormat::Md => {
            if config.targets.is_empty() {
                println!("{}", style("No targets configured").dim());
                println!(
                    "{}",
                    style("Add a `targets` list of {id, name} entries to csvgrader.yaml.").dim()
                );
                return Ok(());
            }
            for target in &config.targets {
                let marker = if config.default_target.as_deref() == Some(target.id.as_str()) {
                    style("*").green().to_string()
                } else {
                    " ".to_string()
                };
                println!("{} {}", marker, target);
            }
            if !global.quiet {
                println!();
                println!(
                    "{} target(s) configured",
                    style(config.targets.len()).cyan()
                );
            }
        }
    }

    Ok(())
}
