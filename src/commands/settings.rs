//! `windcode models` and `windcode config`.

use std::path::Path;

use colored::Colorize;

use crate::config::{AppConfig, StorageBackend};
use crate::inference::InferenceClient;

/// List the models the inference server offers, marking the configured one.
pub async fn show_models(client: &InferenceClient) {
    let reachable = client.health_check().await;
    let status = if reachable {
        "reachable".green()
    } else {
        "unreachable".red()
    };
    println!("{} {}", client.base_url().bold(), status);

    for model in client.list_models().await {
        if model == client.model() {
            println!("  {} {}", "*".green(), model.bold());
        } else {
            println!("    {model}");
        }
    }
}

/// One line per setting, secrets masked.
pub fn config_summary(config: &AppConfig, source: Option<&Path>) -> Vec<String> {
    let storage = match config.storage.backend {
        StorageBackend::Sqlite => format!(
            "sqlite ({})",
            config.storage.sqlite_path.as_deref().unwrap_or("<data dir>/windcode.db")
        ),
        StorageBackend::Rest => format!(
            "rest ({}, key {})",
            config.storage.rest_url().unwrap_or("<unset>"),
            if config.storage.rest_anon_key().is_some() { "set" } else { "unset" }
        ),
    };

    vec![
        format!(
            "config file:   {}",
            source.map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string())
        ),
        format!("inference:     {} model {}", config.inference.base_url, config.inference.model),
        format!(
            "sampling:      temperature {} max_tokens {}",
            config.inference.temperature, config.inference.max_tokens
        ),
        format!("storage:       {storage}"),
        format!(
            "relay:         on_decline {:?} on_error {:?} max_tool_rounds {}",
            config.relay.on_decline, config.relay.on_error, config.relay.max_tool_rounds
        ),
        format!(
            "workspace:     project {} poll every {}s",
            config.workspace.project_id.as_deref().unwrap_or("<cached>"),
            config.workspace.poll_interval_secs
        ),
        format!("data dir:      {}", crate::data_dir().display()),
    ]
}

pub fn show_config(config: &AppConfig, source: Option<&Path>) {
    for line in config_summary(config, source) {
        println!("{line}");
    }
}
