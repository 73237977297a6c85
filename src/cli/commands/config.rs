//! `csvgrader config` command - Configuration management
//!
//! Provides commands to view and modify csvgrader configuration.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::config::LOCAL_CONFIG_FILE;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., endpoint, default_target)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of the local config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of the local config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("endpoint", "URL of the grading endpoint's import handler"),
    ("token", "Bearer token sent with import requests"),
    ("default_target", "Target block used when --target is omitted"),
    ("max_grade", "Max grade used when --max-grade is omitted"),
    ("timeout_secs", "HTTP request timeout in seconds (default 30)"),
];

/// Keys stored as YAML numbers rather than strings
const NUMERIC_KEYS: &[&str] = &["max_grade", "timeout_secs"];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load_from(global.config.as_deref());

    // If a specific key is requested, show just that value
    if let Some(key) = &args.key {
        let value = get_config_value(&config, key);
        if let Some(v) = value {
            println!("{}", v);
        } else {
            return Err(miette::miette!("Key '{}' is not set", key));
        }
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();

    for (key, _) in VALID_KEYS {
        let value = get_config_value(&config, key);
        let shown = if *key == "token" {
            value.map(|_| "********".to_string())
        } else {
            value
        };
        print_config_value(key, shown.as_deref());
    }
    println!(
        "  {}: {}",
        style("targets").cyan(),
        style(format!("{} configured", config.targets.len())).yellow()
    );

    // Show source info
    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Command-line flags");
    println!("  2. Environment variables (CSVGRADER_ENDPOINT, CSVGRADER_TOKEN, CSVGRADER_TARGET, CSVGRADER_MAX_GRADE)");
    println!("  3. Local config (./{})", LOCAL_CONFIG_FILE);
    println!("  4. Global config (~/.config/csvgrader/config.yaml)");

    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    if !VALID_KEYS.iter().any(|(k, _)| *k == args.key) {
        return Err(miette::miette!(
            help = "run 'csvgrader config keys' to list valid keys",
            "Unknown configuration key '{}'",
            args.key
        ));
    }

    let config_path = config_path(args.global, global)?;

    // Load existing config or create new
    let mut config_map = read_mapping(&config_path)?;
    let value = yaml_value(&args.key, &args.value)?;

    if let serde_yml::Value::Mapping(map) = &mut config_map {
        map.insert(serde_yml::Value::String(args.key.clone()), value);
    }

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }
    }

    // Write back
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "local" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = config_path(args.global, global)?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;

    let removed = match &mut config_map {
        serde_yml::Value::Mapping(map) => map
            .remove(&serde_yml::Value::String(args.key.clone()))
            .is_some(),
        _ => false,
    };

    if !removed {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "local" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = get_global_config_path()?;
    let local_path = config_path(false, global)?;

    println!("{}", style("Configuration file paths:").bold());
    println!();
    print_path("Global:", &global_path);
    println!();
    print_path("Local:", &local_path);

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'csvgrader config set <key> <value>' to set a value.").dim()
    );
    println!(
        "{}",
        style("The `targets` list ({id, name} entries) is edited directly in the YAML file.").dim()
    );

    Ok(())
}

// Helper functions

fn get_global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn config_path(global_scope: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if global_scope {
        get_global_config_path()
    } else {
        Ok(global
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE)))
    }
}

fn read_mapping(path: &Path) -> Result<serde_yml::Value> {
    if !path.exists() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    let parsed: serde_yml::Value =
        serde_yml::from_str(&content).unwrap_or(serde_yml::Value::Mapping(Default::default()));
    // If the file was empty or null, use an empty mapping
    if parsed.is_null() {
        Ok(serde_yml::Value::Mapping(Default::default()))
    } else {
        Ok(parsed)
    }
}

fn yaml_value(key: &str, value: &str) -> Result<serde_yml::Value> {
    if !NUMERIC_KEYS.contains(&key) {
        return Ok(serde_yml::Value::String(value.to_string()));
    }
    match key {
        "timeout_secs" => value
            .trim()
            .parse::<u64>()
            .map(serde_yml::Value::from)
            .map_err(|_| miette::miette!("'{}' expects a whole number of seconds", key)),
        _ => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|g| g.is_finite())
            .map(serde_yml::Value::from)
            .ok_or_else(|| miette::miette!("'{}' expects a number", key)),
    }
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "endpoint" => config.endpoint.clone(),
        "token" => config.token.clone(),
        "default_target" => config.default_target.clone(),
        "max_grade" => config.max_grade.map(|g| g.to_string()),
        "timeout_secs" => config.timeout_secs.map(|t| t.to_string()),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_path(label: &str, path: &Path) {
    println!("  {} {}", style(label).cyan(), path.display());
    if path.exists() {
        println!("         {}", style("(exists)").green());
    } else {
        println!("         {}", style("(not created)").dim());
    }
}
