use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::FontPrintConfig;
use crate::corpus::nearest_matches;
use crate::error::FontPrintError;
use crate::fontprint::{FontPrint, FontPrinter};
use crate::layout::LayoutInput;
use crate::logging::PerformanceTimer;
use crate::repository::{FingerprintRepository, JsonFileRepository};
use crate::similarity::compare;

#[derive(Parser)]
#[command(name = "fontprint")]
#[command(about = "Build and compare typographic layout fingerprints")]
pub struct Cli {
    /// TOML configuration file (defaults plus FONTPRINT_* env overrides otherwise)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level for the fontprint target
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Also write daily-rotated logs into this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a FontPrint from a layout input JSON file
    Build {
        /// Layout input (`{"source": "Recognized" | "Structured" | "Virtual", ...}`)
        input: PathBuf,

        /// Write the print here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append the print to this corpus file
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Compare two FontPrint JSON files
    Compare { left: PathBuf, right: PathBuf },

    /// Rank a corpus against a probe print
    Search {
        #[arg(long)]
        corpus: PathBuf,

        #[arg(long)]
        probe: PathBuf,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Inspect or edit a corpus file
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Write the default configuration to a TOML file
    InitConfig { path: PathBuf },
}

#[derive(Subcommand)]
pub enum CorpusAction {
    /// List stored prints
    List { corpus: PathBuf },

    /// Remove a print by id
    Remove { corpus: PathBuf, id: String },
}

pub fn load_config(path: Option<&Path>) -> Result<FontPrintConfig> {
    let mut config = match path {
        Some(path) => FontPrintConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FontPrintConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Whether a command failed on a condition that retrying with other input cannot fix
pub fn is_fatal(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<FontPrintError>()
        .map_or(false, |e| !e.is_recoverable())
}

fn read_print(path: &Path) -> Result<FontPrint> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading fontprint {}", path.display()))?;
    Ok(FontPrint::from_json(&content)?)
}

/// Build a print from a layout input file
pub fn build_command(
    config: FontPrintConfig,
    input: &Path,
    output: Option<&Path>,
    store: Option<&Path>,
) -> Result<FontPrint> {
    let timer = PerformanceTimer::start(format!("build {}", input.display()));

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("reading layout input {}", input.display()))?;
    let layout: LayoutInput = serde_json::from_str(&content)
        .with_context(|| format!("parsing layout input {}", input.display()))?;

    let printer = FontPrinter::new(config);
    let print = match store {
        Some(corpus) => {
            let mut repository = JsonFileRepository::new(corpus);
            let print = printer.fingerprint_into(&layout, &mut repository)?;
            info!("Stored {} in {}", print.id, corpus.display());
            print
        }
        None => printer.fingerprint(&layout)?,
    };
    timer.checkpoint("fingerprinted");

    let json = print.to_json_pretty()?;
    match output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
            info!("FontPrint written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(print)
}

pub fn compare_command(config: &FontPrintConfig, left: &Path, right: &Path) -> Result<()> {
    let left = read_print(left)?;
    let right = read_print(right)?;
    let comparison = compare(&left, &right, &config.similarity);
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}

pub fn search_command(config: &FontPrintConfig, corpus: &Path, probe: &Path, limit: usize) -> Result<()> {
    let probe = read_print(probe)?;
    let stored = JsonFileRepository::new(corpus).list()?;
    let matches = nearest_matches(&probe, &stored, limit, &config.similarity);
    println!("{}", serde_json::to_string_pretty(&matches)?);
    Ok(())
}

pub fn corpus_command(action: &CorpusAction) -> Result<()> {
    match action {
        CorpusAction::List { corpus } => {
            for print in JsonFileRepository::new(corpus).list()? {
                println!(
                    "{}  {:<10}  {}  {:?}",
                    print.id, print.source, print.fingerprint_hash, print.vector
                );
            }
        }
        CorpusAction::Remove { corpus, id } => {
            let mut repository = JsonFileRepository::new(corpus);
            if repository.remove(id)? {
                println!("Removed {}", id);
            } else {
                anyhow::bail!("No fontprint with id {} in {}", id, corpus.display());
            }
        }
    }
    Ok(())
}

pub fn init_config_command(path: &Path) -> Result<()> {
    FontPrintConfig::default().save_to_file(path)?;
    println!("Default configuration written to {}", path.display());
    Ok(())
}
