//! `csvgrader import` command - Submit a grades CSV to the grading endpoint

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use log::warn;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::preview::print_preview;
use crate::cli::helpers::{is_interactive, runtime};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::coordinator::{ImportCoordinator, ImportError};
use crate::core::endpoint::HttpEndpoint;
use crate::core::history::LastImport;
use crate::core::report::{ImportReport, ReportLine};
use crate::core::request::{Action, ImportRequest};
use crate::core::session::{read_snapshot, CsvSnapshot};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file with `identifier,grade` lines
    pub file: PathBuf,

    /// Target problem block (default: `default_target` from config)
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Maximum grade; anything that is not a number falls back to 1.0
    #[arg(long, allow_hyphen_values = true)]
    pub max_grade: Option<String>,

    /// Grading endpoint URL (overrides config)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the request that would be sent without sending it
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load_from(global.config.as_deref());
    runtime()?.block_on(run_import(args, global, config))
}

async fn run_import(args: ImportArgs, global: &GlobalOpts, config: Config) -> Result<()> {
    let max_grade = args
        .max_grade
        .clone()
        .or_else(|| config.max_grade.map(|g| g.to_string()));

    let snapshot = read_snapshot(&args.file).await?;
    show_preview(&snapshot, global)?;

    // Local preconditions first: no endpoint is needed to reject a file
    let target = resolve_target(&args, &config, &snapshot)?;
    let request =
        ImportRequest::prepare(Some(&snapshot), max_grade.as_deref(), target.as_deref())?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&request).into_diagnostic()?);
        eprintln!();
        eprintln!(
            "{}",
            style("Dry run complete. Nothing was sent.").yellow()
        );
        return Ok(());
    }

    let url = args
        .endpoint
        .clone()
        .or_else(|| config.endpoint.clone())
        .ok_or_else(|| {
            miette::miette!(
                help = "pass --endpoint <URL>, set CSVGRADER_ENDPOINT, or run 'csvgrader config set endpoint <URL>'",
                "No grading endpoint configured"
            )
        })?;
    let endpoint = HttpEndpoint::new(url, config.timeout())
        .map_err(ImportError::from)?
        .with_token(config.token.clone());

    let target = request.target_block.as_str();
    if !confirm(&args, &snapshot, target)? {
        println!("{}", style("Import cancelled.").dim());
        return Ok(());
    }

    if !global.quiet && global.format != OutputFormat::Json {
        println!(
            "{} Importing {} row(s) from {} into {}",
            style("→").blue(),
            style(snapshot.dataset().total()).cyan(),
            style(args.file.display()).yellow(),
            style(target).cyan()
        );
        println!();
    }

    let coordinator = ImportCoordinator::new(endpoint);
    coordinator.adopt(snapshot);
    let report = coordinator
        .submit(max_grade.as_deref(), Some(target))
        .await?;

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    } else if report.success {
        print_report(&report);
    }

    if let Some(failure) = report.failure.clone() {
        return Err(failure.into());
    }

    record_last_import(&report, target);
    if !global.quiet && global.format != OutputFormat::Json {
        if let Some(summary) = coordinator.last_summary() {
            println!();
            println!("{}", style(format!("Last import: {}", summary)).dim());
        }
    }

    Ok(())
}

fn show_preview(snapshot: &CsvSnapshot, global: &GlobalOpts) -> Result<()> {
    if global.quiet || global.format == OutputFormat::Json {
        return Ok(());
    }
    print_preview(snapshot.dataset(), global.format)?;
    println!();
    Ok(())
}

/// Flag, then configured default, then an interactive pick
fn resolve_target(
    args: &ImportArgs,
    config: &Config,
    snapshot: &CsvSnapshot,
) -> Result<Option<String>> {
    if let Some(target) = args.target.clone().or_else(|| config.default_target.clone()) {
        return Ok(Some(target));
    }

    if config.targets.is_empty() || !snapshot.has_rows() || !is_interactive() {
        return Ok(None);
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Target problem block")
        .items(&config.targets)
        .default(0)
        .interact_opt()
        .into_diagnostic()?;

    Ok(selection.map(|i| config.targets[i].id.clone()))
}

fn confirm(args: &ImportArgs, snapshot: &CsvSnapshot, target: &str) -> Result<bool> {
    if args.yes || !is_interactive() {
        return Ok(true);
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Import {} grade(s) into {}?",
            snapshot.dataset().total(),
            target
        ))
        .default(true)
        .interact()
        .into_diagnostic()
}

fn print_report(report: &ImportReport) {
    for line in report.lines() {
        let text = line.to_string();
        match line {
            ReportLine::Summary(_) => println!("{}", style(text).green().bold()),
            ReportLine::Outcome(outcome) if outcome.action == Action::Created => {
                println!("{}", style(text).green())
            }
            ReportLine::Outcome(_) => println!("{}", style(text).yellow()),
            ReportLine::ErrorsHeader => {
                println!();
                println!("{}", style(text).red());
            }
            ReportLine::RowError(_) | ReportLine::Failure(_) => {
                println!("{}", style(text).red())
            }
        }
    }

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Created:  {}", style(report.created_count()).green());
    println!("  Updated:  {}", style(report.updated_count()).yellow());
    if !report.errors.is_empty() {
        println!("  Errors:   {}", style(report.errors.len()).red());
    }
}

fn record_last_import(report: &ImportReport, target: &str) {
    let record = LastImport::from_report(report, target);
    let saved = LastImport::default_path().and_then(|path| record.save(&path));
    if let Err(e) = saved {
        warn!("could not record last import: {}", e);
    }
}
