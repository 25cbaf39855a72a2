//! cfgdiff command-line interface.
//!
//! Loads two configuration snapshots, compares them with the built-in
//! schemas (optionally extended from a schema file) and prints the change
//! set.

use anyhow::{Context, Result};
use cfgdiff::{
    compute_diff, filter_changes, format_change_set, load_document, DiffConfig, FilterConfig,
    OutputFormat, OutputOptions, ReorderBasis, SchemaRegistry,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// cfgdiff - Semantic diff for network device configuration snapshots
///
/// Pairs firewall rules, interfaces, routes and other entities by stable id
/// and reports what was added, removed, modified or reordered, ignoring
/// cosmetic differences such as leading zeros in addresses or letter case
/// in protocol names.
#[derive(Parser)]
#[command(name = "cfgdiff")]
#[command(version)]
#[command(about = "Semantic diff for configuration snapshots", long_about = None)]
struct Cli {
    /// Older snapshot
    #[arg(value_name = "OLD")]
    old: PathBuf,

    /// Newer snapshot
    #[arg(value_name = "NEW")]
    new: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "terminal")]
    format: OutputFormatArg,

    /// Schema file (TOML) extending the built-in schemas
    #[arg(long, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Also list unchanged entities
    #[arg(long)]
    verbose_changes: bool,

    /// Count pure position changes as unchanged
    #[arg(long)]
    no_reorders: bool,

    /// Detect reorders by rank among entities present in both snapshots
    #[arg(long)]
    relative_order: bool,

    /// Treat a missing field as equal to an empty one
    #[arg(long)]
    missing_as_empty: bool,

    /// Compare collections in parallel
    #[arg(long)]
    parallel: bool,

    /// Ignore changes matching a path pattern (e.g. "**.description")
    #[arg(long, value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Only show changes matching a path pattern (e.g. "rules.**")
    #[arg(long, value_name = "PATTERN")]
    only: Vec<String>,

    /// Maximum length for displayed values
    #[arg(long, default_value = "80")]
    max_value_length: usize,

    /// Debug logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (only show changes, suppress summary)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format argument for clap
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormatArg {
    /// Colored terminal output
    Terminal,
    /// JSON representation
    Json,
    /// Plain text (no colors)
    Plain,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Terminal => OutputFormat::Terminal,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Plain => OutputFormat::Plain,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cfgdiff=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cfgdiff=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let old = load_document(&cli.old)
        .with_context(|| format!("Failed to load old snapshot: {}", cli.old.display()))?;
    let new = load_document(&cli.new)
        .with_context(|| format!("Failed to load new snapshot: {}", cli.new.display()))?;

    let registry = match &cli.schema {
        Some(path) => {
            let extra = SchemaRegistry::from_file(path)
                .with_context(|| format!("Failed to load schema file: {}", path.display()))?;
            SchemaRegistry::builtin().merge(extra)
        }
        None => SchemaRegistry::builtin(),
    };
    debug!(
        collections = registry.collection_names().count(),
        "schemas ready"
    );

    let config = DiffConfig {
        include_unchanged: cli.verbose_changes,
        report_reorders: !cli.no_reorders,
        reorder_basis: if cli.relative_order {
            ReorderBasis::Relative
        } else {
            ReorderBasis::Absolute
        },
        treat_missing_as_empty: cli.missing_as_empty,
        parallel: cli.parallel,
    };

    let set = compute_diff(&old, &new, &registry, &config);

    let filter = cli
        .ignore
        .iter()
        .fold(FilterConfig::new(), |f, p| f.ignore(p));
    let filter = cli.only.iter().fold(filter, |f, p| f.only(p));
    let set = filter_changes(&set, &filter);

    let options = OutputOptions {
        show_diagnostics: true,
        max_value_length: cli.max_value_length,
    };
    let output_format: OutputFormat = cli.format.into();
    let output = format_change_set(&set, &output_format, &options)
        .context("Failed to format change set")?;

    if !cli.quiet || output_format == OutputFormat::Json {
        println!("{}", output);
    } else {
        for line in output.lines() {
            if !line.starts_with("Summary:") && !line.trim().is_empty() {
                println!("{}", line);
            }
        }
    }

    if set.is_empty() {
        Ok(0)
    } else {
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_output_format_conversion() {
        assert_eq!(
            OutputFormat::from(OutputFormatArg::Terminal),
            OutputFormat::Terminal
        );
        assert_eq!(
            OutputFormat::from(OutputFormatArg::Json),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::from(OutputFormatArg::Plain),
            OutputFormat::Plain
        );
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeatable_patterns() {
        let cli = Cli::parse_from([
            "cfgdiff",
            "a.json",
            "b.json",
            "--ignore",
            "**.description",
            "--ignore",
            "users.*",
            "--only",
            "rules.**",
        ]);
        assert_eq!(cli.ignore.len(), 2);
        assert_eq!(cli.only, vec!["rules.**".to_string()]);
    }
}
