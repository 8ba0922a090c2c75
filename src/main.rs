use anyhow::Result;
use clap::Parser;

use fontprint::cli::{self, Cli, Commands};
use fontprint::logging::{cleanup_old_logs, init_logging, LoggingConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli.log_level.clone(),
        enable_file_logging: cli.log_dir.is_some(),
        log_dir: cli.log_dir.clone().unwrap_or_else(|| LoggingConfig::default().log_dir),
        ..LoggingConfig::default()
    };
    let _guard = init_logging(&logging)?;
    cleanup_old_logs(&logging)?;

    let config = cli::load_config(cli.config.as_deref())?;

    let result = match &cli.command {
        Commands::Build { input, output, store } => {
            cli::build_command(config, input, output.as_deref(), store.as_deref()).map(|_| ())
        }
        Commands::Compare { left, right } => cli::compare_command(&config, left, right),
        Commands::Search { corpus, probe, limit } => cli::search_command(&config, corpus, probe, *limit),
        Commands::Corpus { action } => cli::corpus_command(action),
        Commands::InitConfig { path } => cli::init_config_command(path),
    };

    if let Err(e) = &result {
        if cli::is_fatal(e) {
            tracing::error!("Fatal: {:#}", e);
        } else {
            tracing::error!("{:#}, check the input and retry", e);
        }
    }
    result
}
