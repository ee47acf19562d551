use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use lcovr::config::{Config, CONFIG_FILE};
use lcovr::coverage::format_rate;
use lcovr::discovery::{discover_inputs, discover_source_roots};
use lcovr::{check_threshold, convert, ConversionSummary, ConvertOptions};

const DEFAULT_OUTPUT: &str = "coverage.xml";

#[derive(Parser)]
#[command(name = "lcovr")]
#[command(about = "Convert LCOV tracefiles into a Cobertura XML coverage report")]
#[command(version)]
struct Cli {
    /// LCOV files or glob patterns (repeatable)
    #[arg(short, long = "input", value_name = "GLOB")]
    inputs: Vec<String>,

    /// Source directories or glob patterns listed in <sources> (repeatable)
    #[arg(short, long = "source", value_name = "GLOB")]
    sources: Vec<String>,

    /// Output path for the Cobertura report (default: coverage.xml)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to config file (default: lcovr.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail when the total line rate is below this value (0.0 - 1.0)
    #[arg(long, value_name = "RATE")]
    min_line_rate: Option<f64>,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let (mut config, base_dir) = load_config(cli.config.as_deref(), &cwd)?;

    if cli.min_line_rate.is_some() {
        config.min_line_rate = cli.min_line_rate;
    }
    config.validate()?;

    // Flags override the config file. Flag values are relative to the working
    // directory, config values to the config file's directory.
    let (input_patterns, input_base) =
        pick_patterns(&cli.inputs, &config.input.patterns, &cwd, &base_dir);
    let (source_patterns, source_base) =
        pick_patterns(&cli.sources, &config.sources.patterns, &cwd, &base_dir);
    let output = match (cli.output, config.output.clone()) {
        (Some(output), _) => cwd.join(output),
        (None, Some(output)) => base_dir.join(output),
        (None, None) => cwd.join(DEFAULT_OUTPUT),
    };

    if input_patterns.is_empty() {
        anyhow::bail!(
            "No LCOV inputs given. Pass --input or set [input] patterns in {}.",
            CONFIG_FILE
        );
    }

    let inputs = discover_inputs(input_base, input_patterns)?;
    let roots = discover_source_roots(source_base, source_patterns)?;
    for pattern in &roots.unmatched {
        eprintln!(
            "{} source pattern '{}' matched no directory",
            "warning:".yellow().bold(),
            pattern
        );
    }

    if !cli.quiet {
        println!(
            "\n{} {} LCOV file(s) to convert\n",
            "→".blue(),
            inputs.len()
        );
    }

    let summary = convert(&ConvertOptions {
        inputs,
        source_roots: roots.dirs,
        output,
    })?;

    if !cli.quiet {
        print_summary(&summary);
    }

    let threshold = check_threshold(&summary.report, config.min_line_rate);
    if !cli.quiet {
        threshold.print_summary();
    }
    if !threshold.passed {
        anyhow::bail!(
            "Line rate {} is below the minimum of {}",
            format_rate(threshold.line_rate),
            format_rate(config.min_line_rate.unwrap_or_default())
        );
    }

    Ok(())
}

fn pick_patterns<'a>(
    from_cli: &'a [String],
    from_config: &'a [String],
    cwd: &'a Path,
    base_dir: &'a Path,
) -> (&'a [String], &'a Path) {
    if from_cli.is_empty() {
        (from_config, base_dir)
    } else {
        (from_cli, cwd)
    }
}

/// Load the explicit config, or `lcovr.toml` from the working directory when it exists.
/// Returns the config with the directory its relative paths are resolved against.
fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<(Config, PathBuf)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = cwd.join(CONFIG_FILE);
            if !default.is_file() {
                return Ok((Config::default(), cwd.to_path_buf()));
            }
            default
        }
    };

    let path = std::fs::canonicalize(&path)
        .with_context(|| format!("Could not find config file: {}", path.display()))?;
    let config =
        Config::load(&path).with_context(|| format!("Could not load {}", path.display()))?;

    let base_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| cwd.to_path_buf());

    Ok((config, base_dir))
}

fn print_summary(summary: &ConversionSummary) {
    for input in &summary.inputs {
        println!(
            "  {} {} {}",
            "•".green(),
            input.path.display(),
            format!("({} records)", input.records).dimmed()
        );
    }

    println!(
        "\n{} Read information for {} source files in {} package(s).",
        "✓".green(),
        summary.record_count(),
        summary.package_count()
    );
    println!(
        "{} Line rate: {}",
        "📊".cyan(),
        format_rate(summary.line_rate()).bold()
    );
    println!(
        "{} Report written: {}",
        "→".blue(),
        summary.output.display().to_string().green()
    );
}
