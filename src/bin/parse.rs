//! Metadata Parser CLI
//!
//! Parses dataset metadata documents and prints the resulting graph as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dataset_metadata::{InMemoryLicenseCatalog, MetadataParser, Parsed, ParserConfig, Validation};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metadata-parse")]
#[command(about = "Parse and validate dataset metadata documents")]
struct Cli {
    /// Metadata block definitions (file or directory); builtin blocks by default
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    /// Config file (metadata.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Accept alternate spellings of controlled vocabulary values
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a dataset version document
    Version {
        /// Document to parse (JSON)
        file: PathBuf,
    },

    /// Parse a dataset document with its version
    Dataset {
        /// Document to parse (JSON)
        file: PathBuf,
    },

    /// Parse a { "fields": [...] } submission
    Fields {
        /// Document to parse (JSON)
        file: PathBuf,
        /// Skip multiple/typeClass checks, as for incremental edits
        #[arg(long)]
        partial: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref().and_then(Path::to_str);
    let mut config = ParserConfig::load_from(config_path).context("loading configuration")?;
    if cli.lenient {
        config.parser.lenient = true;
    }
    if let Some(schema) = cli.schema {
        config.registry.schema_path = Some(schema);
    }

    let registry = config.load_registry().context("loading metadata block definitions")?;
    let licenses = InMemoryLicenseCatalog::standard();
    let parser = MetadataParser::from_config(&registry, &config).with_licenses(&licenses);

    match cli.command {
        Commands::Version { file } => {
            let doc = read_document(&file)?;
            emit(parser.parse_dataset_version(&doc)?)
        }

        Commands::Dataset { file } => {
            let doc = read_document(&file)?;
            emit(parser.parse_dataset(&doc)?)
        }

        Commands::Fields { file, partial } => {
            let doc = read_document(&file)?;
            let validation = if partial { Validation::Partial } else { Validation::Full };
            emit(parser.parse_fields(&doc, validation)?)
        }
    }
}

fn read_document(path: &Path) -> anyhow::Result<Value> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn emit<T: Serialize>(parsed: Parsed<T>) -> anyhow::Result<()> {
    for warning in &parsed.warnings {
        eprintln!("warning: {}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&parsed.value)?);
    Ok(())
}
