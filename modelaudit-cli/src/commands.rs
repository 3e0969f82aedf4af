//! Subcommand handlers.

use crate::{Commands, ConfigAction, build_registry, config_path};
use modelaudit_core::{AuditConfig, Hub};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

pub async fn handle_command(
    command: Commands,
    config: &AuditConfig,
    workspace: &Path,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Metrics => {
            let hub = Arc::new(Hub::new(config.hub.clone(), config.retry.clone())?);
            let registry = build_registry(config, &hub)?;
            let mut stdout = std::io::stdout().lock();
            write_metric_table(&registry.names(), config, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => {
            handle_config(action, config, workspace)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One `name  weight` row per metric. Metrics outside the net score show `-`.
pub fn write_metric_table<W: Write>(
    names: &[String],
    config: &AuditConfig,
    out: &mut W,
) -> std::io::Result<()> {
    let width = names.iter().map(String::len).max().unwrap_or(0);
    for name in names {
        match config.scoring.weights.get(name) {
            Some(weight) => writeln!(out, "{name:<width$}  {weight:.2}")?,
            None => writeln!(out, "{name:<width$}  -")?,
        }
    }
    Ok(())
}

fn handle_config(action: ConfigAction, config: &AuditConfig, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_path(workspace);
            if path.exists() {
                println!("Configuration file already exists at: {}", path.display());
                return Ok(());
            }
            let toml_str = toml::to_string_pretty(&AuditConfig::default())?;
            std::fs::write(&path, &toml_str)?;
            println!("Created default configuration at: {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
    }
}
