use crate::config::ExtractConfig;
use crate::diagnostics::CodeFrame;
use crate::extract::extract_modules;
use crate::lower::lower_files;
use crate::parser::{AstParser, ParsedFile};
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command-line arguments for the schema extractor.
///
/// # Example
///
/// ```bash
/// gql-from-source ./my-server -o schema.yaml --resolvers resolvers.yaml
/// gql-from-source ./my-server -f json -c gql.yaml --nullable-by-default
/// ```
#[derive(Parser, Debug)]
#[command(name = "gql-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project (or a single `.rs` file) to analyze
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format for the schema and resolver map
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file for the schema (defaults to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// YAML or JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Also write the resolver map to this file
    #[arg(long = "resolvers", value_name = "FILE")]
    pub resolvers_path: Option<PathBuf>,

    /// Treat bare output types as nullable
    #[arg(long = "nullable-by-default")]
    pub nullable_by_default: bool,

    /// Mark fields nullable only by default as semantically non-null
    #[arg(long = "strict-semantic-nullability")]
    pub strict_semantic_nullability: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The schema was written.
    Written,
    /// Extraction reported this many diagnostics; nothing was written.
    Rejected(usize),
}

pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validates arguments that clap cannot check on its own.
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }
    if let Some(config) = &args.config_path {
        if !config.is_file() {
            anyhow::bail!("Config file does not exist: {}", config.display());
        }
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Loads the configuration file, if any, and applies the command-line overrides.
pub fn load_config(args: &CliArgs) -> Result<ExtractConfig> {
    let mut config = match &args.config_path {
        Some(path) => ExtractConfig::load(path)?,
        None => ExtractConfig::default(),
    };
    if args.nullable_by_default {
        config.nullable_by_default = true;
    }
    if args.strict_semantic_nullability {
        config.strict_semantic_nullability = true;
    }
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

pub fn run(args: CliArgs) -> Result<RunOutcome> {
    info!("Starting schema extraction...");
    let config = load_config(&args)?;

    info!("Scanning project directory...");
    let scan_result = FileScanner::new(args.project_path.clone()).scan()?;
    info!("Found {} Rust files", scan_result.rust_files.len());
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }
    if scan_result.rust_files.is_empty() {
        anyhow::bail!("No Rust files found in {}", args.project_path.display());
    }

    info!("Parsing Rust files...");
    let parsed_files: Vec<ParsedFile> = AstParser::parse_files(&scan_result.rust_files)
        .into_iter()
        .filter_map(|result| match result {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping file: {}", e);
                None
            }
        })
        .collect();
    info!("Successfully parsed {} files", parsed_files.len());
    if parsed_files.is_empty() {
        anyhow::bail!("No files could be parsed successfully");
    }

    let modules = lower_files(&parsed_files)?;
    info!("Extracting schema...");
    let output = match extract_modules(&modules, &config)? {
        Ok(output) => output,
        Err(diagnostics) => {
            eprintln!("{}", CodeFrame::new(&modules.sources).format_all(&diagnostics));
            eprintln!(
                "error: schema extraction failed with {} diagnostic{}",
                diagnostics.len(),
                if diagnostics.len() == 1 { "" } else { "s" }
            );
            return Ok(RunOutcome::Rejected(diagnostics.len()));
        }
    };

    let schema = render(&output.schema, args.output_format)?;
    match &args.output_path {
        Some(path) => {
            write_to_file(&schema, path)?;
            info!("Wrote schema to {}", path.display());
        }
        None => println!("{}", schema),
    }
    if let Some(path) = &args.resolvers_path {
        write_output(&output.resolvers, args.output_format, path)?;
        info!("Wrote resolver map to {}", path.display());
    }

    info!("Extraction complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", scan_result.rust_files.len());
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Types: {}", output.schema.types.len());
    info!("  - Directives: {}", output.schema.directives.len());
    info!("  - Resolvers: {}", output.resolvers.len());

    Ok(RunOutcome::Written)
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serialize_yaml(value),
        OutputFormat::Json => serialize_json(value),
    }
}

fn write_output<T: Serialize>(value: &T, format: OutputFormat, path: &Path) -> Result<()> {
    let content = render(value, format)?;
    write_to_file(&content, path)
}
