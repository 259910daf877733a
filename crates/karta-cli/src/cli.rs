//! Command dispatch and formatting for the `karta` entrypoint.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::{Context, Result, bail};
use karta::loader::discover_feature_files;
use karta::tags::TagExpression;
use karta::{ScenarioRef, TestCatalog, load_feature_file};

use crate::config::LogLevel;

/// Check, compile and inspect karta feature files.
#[derive(Parser, Debug)]
#[command(name = "karta", version, about)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,
    #[command(subcommand)]
    /// Command to run.
    pub command: Commands,
}

/// Supported commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate feature files and directories.
    Check {
        /// Files or directories to check.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the structured form of a feature file.
    Compile {
        /// Feature file to compile.
        file: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// List scenarios, optionally filtered by tags.
    Scenarios(ScenariosArgs),
}

/// Arguments of the `scenarios` command.
#[derive(Args, Debug)]
pub struct ScenariosArgs {
    /// Files or directories to read.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Comma-separated tags or names; scenarios matching any are listed.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    /// Tag expression such as `@smoke and not @slow`.
    #[arg(long, conflicts_with = "tags")]
    pub expr: Option<String>,
}

/// Structured output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

/// Run `cli`, writing command output to `out`.
///
/// # Errors
/// Returns an error when a feature cannot be loaded, a check fails, or
/// output cannot be written.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Check { paths } => check(paths, out),
        Commands::Compile { file, format } => compile(file, *format, out),
        Commands::Scenarios(args) => scenarios(args, out),
    }
}

/// Replace directories in `paths` by the feature files beneath them.
fn expand(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = discover_feature_files(path)
                .wrap_err_with(|| format!("failed to scan {}", path.display()))?;
            tracing::debug!(dir = %path.display(), files = found.len(), "discovered feature files");
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        bail!("no feature files found");
    }
    Ok(files)
}

fn check(paths: &[PathBuf], out: &mut dyn Write) -> Result<()> {
    let files = expand(paths)?;
    let mut failed = 0_usize;
    for file in &files {
        match load_feature_file(file) {
            Ok(feature) => writeln!(
                out,
                "ok    {} ({} scenario(s))",
                file.display(),
                feature.scenarios.len()
            ),
            Err(err) => {
                failed += 1;
                writeln!(out, "error {err}")
            }
        }
        .wrap_err("failed to write check results")?;
    }
    if failed > 0 {
        bail!("{failed} of {} feature file(s) failed to load", files.len());
    }
    Ok(())
}

fn compile(file: &Path, format: Format, out: &mut dyn Write) -> Result<()> {
    let feature = load_feature_file(file)?;
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, &feature).wrap_err("failed to write JSON")?;
            writeln!(out).wrap_err("failed to write JSON")
        }
        Format::Yaml => serde_yaml::to_writer(&mut *out, &feature).wrap_err("failed to write YAML"),
    }
}

fn scenarios(args: &ScenariosArgs, out: &mut dyn Write) -> Result<()> {
    let features = expand(&args.paths)?
        .iter()
        .map(load_feature_file)
        .collect::<Result<Vec<_>, _>>()?;
    let catalog = TestCatalog::new(features);
    let selected = if let Some(expr) = &args.expr {
        let expression = TagExpression::parse(expr)?;
        catalog.filter_with_expression(&expression)
    } else if args.tags.is_empty() {
        catalog.scenarios().collect()
    } else {
        catalog.filter_with_tags(&args.tags)
    };
    tracing::info!(count = selected.len(), "selected scenarios");
    for scenario in &selected {
        write_scenario(out, scenario)?;
    }
    Ok(())
}

fn write_scenario(out: &mut dyn Write, entry: &ScenarioRef<'_>) -> Result<()> {
    let scenario = entry.scenario;
    let source = scenario.source.as_deref().unwrap_or("<unknown>");
    let line = |out: &mut dyn Write| -> std::io::Result<()> {
        write!(
            out,
            "{} :: {} ({source}:{})",
            entry.feature.name, scenario.name, scenario.line_number
        )?;
        for tag in &scenario.tags {
            write!(out, " @{tag}")?;
        }
        writeln!(out)
    };
    line(out).wrap_err_with(|| format!("failed to write scenario {}", scenario.name))
}
