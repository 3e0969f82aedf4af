//! modelaudit CLI. Scores every model in a URL file and prints one NDJSON
//! record per model on stdout.

mod batch;
mod commands;
mod logging;
mod record;

use clap::Parser;
use modelaudit_core::config::{self, AuditConfig};
use modelaudit_core::{Hub, MetricRegistry, MetricsEngine, NetScoreAggregator, WeightTable};
use modelaudit_metrics::metrics::reviewedness::DEFAULT_PR_PAGES;
use modelaudit_metrics::{GenAiRater, HubReviewSource, default_registry};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

/// Exit code for usage errors and unreadable inputs.
const USAGE_EXIT: u8 = 2;

/// Trust scoring for machine-learning model packages
#[derive(Parser, Debug)]
#[command(name = "modelaudit", version, about, long_about = None)]
struct Cli {
    /// File with one `code_url,dataset_url,model_url` line per model
    url_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run metrics one at a time instead of concurrently
    #[arg(long)]
    sequential: bool,

    /// Only run these metrics (comma-separated names)
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Log to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// List the registered metrics and their net score weights
    Metrics,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default `modelaudit.toml` in the current directory
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let secrets = config::load_secrets_file(Some(&workspace));

    let cli = Cli::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_file = std::env::var_os("LOG_FILE").map(PathBuf::from);
    let _log_guard = logging::init(&logging::plan(
        cli.verbose,
        rust_log.as_deref(),
        log_level.as_deref(),
        log_file.as_deref(),
    ));
    if let Some(path) = secrets {
        debug!(path = %path.display(), "Loaded secrets file");
    }

    let mut config = match config::load_config(cli.config.as_deref(), Some(&workspace), None) {
        Ok(config) => config,
        Err(e @ modelaudit_core::ConfigError::FileNotFound { .. }) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(USAGE_EXIT));
        }
        Err(e) => return Err(anyhow::anyhow!("Configuration error: {e}")),
    };
    if cli.sequential {
        config.engine.parallel = false;
    }

    if let Some(command) = cli.command {
        return commands::handle_command(command, &config, &workspace).await;
    }

    let Some(url_file) = cli.url_file else {
        eprintln!("Usage: modelaudit <URL_FILE>");
        return Ok(ExitCode::from(USAGE_EXIT));
    };
    let content = match std::fs::read_to_string(&url_file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("File not found: {} ({e})", url_file.display());
            return Ok(ExitCode::from(USAGE_EXIT));
        }
    };

    let include: Option<HashSet<String>> = (!cli.include.is_empty()).then(|| {
        cli.include
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });

    let hub = Arc::new(Hub::new(config.hub.clone(), config.retry.clone())?);
    let registry = build_registry(&config, &hub)?;
    let lines = batch::usable_lines(batch::parse_url_file(&content));
    info!(file = %url_file.display(), models = lines.len(), metrics = registry.len(), "Starting batch");

    let descriptors = lines.iter().map(|line| batch::descriptor_for(line, &hub)).collect();
    let runner = batch::BatchRunner::new(
        MetricsEngine::new(Arc::new(registry), config.engine.clone()),
        aggregator(&config),
        include,
    );
    let mut stdout = std::io::stdout().lock();
    let written = runner.run(descriptors, &mut stdout).await?;
    info!(records = written, "Batch finished");

    Ok(ExitCode::SUCCESS)
}

pub(crate) fn build_registry(config: &AuditConfig, hub: &Arc<Hub>) -> anyhow::Result<MetricRegistry> {
    let rater = Arc::new(GenAiRater::new(&config.rater)?);
    if !rater.has_api_key() {
        info!(
            env = %config.rater.api_key_env,
            "No rating API key set; LLM-rated metrics will report 0"
        );
    }
    let reviews = Arc::new(HubReviewSource::new(hub.clone(), DEFAULT_PR_PAGES));
    Ok(default_registry(rater, reviews)?)
}

pub(crate) fn aggregator(config: &AuditConfig) -> NetScoreAggregator {
    NetScoreAggregator::new(
        WeightTable::from(config.scoring.weights.clone()),
        config.scoring.normalization,
    )
}

pub(crate) fn config_path(workspace: &Path) -> PathBuf {
    workspace.join("modelaudit.toml")
}
