use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::Result;
use ignisplay_config::{Config, PathManager};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Explicit `--config` wins over the platform location
pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    Ok(explicit.unwrap_or_else(|| PathManager::default().config_file()))
}

pub fn run_config(cmd: ConfigCommands, path: &Path, config: &Config, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(path, config, output),
        ConfigCommands::Init { force } => init_config(path, force, output),
    }
}

fn show_config(path: &Path, config: &Config, output: &Output) -> Result<()> {
    if !output.is_human() {
        output.json(&json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "store": {
                "namespace": config.store.namespace,
                "historyLimit": config.store.history_limit,
                "defaultProgress": config.store.default_progress,
            },
            "retry": {
                "maxAttempts": config.retry.max_attempts,
                "backoffBaseMs": config.retry.backoff_base_ms,
                "backoffMaxMs": config.retry.backoff_max_ms,
                "operationTimeoutMs": config.retry.operation_timeout_ms,
            },
            "logging": {
                "level": config.logging.level,
                "json": config.logging.json,
                "file": config.logging.file.as_ref().map(|f| f.display().to_string()),
            },
        }));
        return Ok(());
    }

    if !path.exists() {
        output.warn(format!("No config file at {}; showing defaults", path.display()));
    }

    let rows = vec![
        vec!["Config File".to_string(), path.display().to_string()],
        vec!["store.namespace".to_string(), config.store.namespace.clone()],
        vec!["store.history_limit".to_string(), config.store.history_limit.to_string()],
        vec!["store.default_progress".to_string(), config.store.default_progress.to_string()],
        vec!["retry.max_attempts".to_string(), config.retry.max_attempts.to_string()],
        vec!["retry.backoff_base_ms".to_string(), config.retry.backoff_base_ms.to_string()],
        vec!["retry.backoff_max_ms".to_string(), config.retry.backoff_max_ms.to_string()],
        vec!["retry.operation_timeout_ms".to_string(), config.retry.operation_timeout_ms.to_string()],
        vec!["logging.level".to_string(), config.logging.level.clone()],
        vec!["logging.json".to_string(), config.logging.json.to_string()],
        vec![
            "logging.file".to_string(),
            config
                .logging
                .file
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_else(|| "(stderr)".to_string()),
        ],
    ];
    output.table(&["Setting", "Value"], rows);
    Ok(())
}

fn init_config(path: &Path, force: bool, output: &Output) -> Result<()> {
    if path.exists() && !force {
        output.warn(format!("Config already exists at {}; pass --force to overwrite", path.display()));
        return Ok(());
    }

    let mut config = Config::default();
    config.logging.file = Some(PathManager::default().log_file());
    config
        .save_to_file(&path.to_path_buf())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to write config to {}: {}", path.display(), e))?;
    output.success(format!("Wrote default configuration to {}", path.display()));
    Ok(())
}
