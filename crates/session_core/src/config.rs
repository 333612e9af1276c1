use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::DEFAULT_QUERY;

pub const DEFAULT_CONFIG_FILE: &str = "data_agent.toml";
const ENV_PREFIX: &str = "DATA_AGENT__";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub download_dir: PathBuf,
    pub default_query: String,
    pub max_display_rows: usize,
    pub max_cell_width: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            download_dir: default_download_dir(),
            default_query: DEFAULT_QUERY.into(),
            max_display_rows: 1000,
            max_cell_width: 40,
            fetch_timeout_secs: 30,
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("data_agent")
        .join("downloads")
}

/// Defaults, then the TOML file, then `DATA_AGENT__*` environment variables.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => match parse_file_values(&raw) {
            Ok(values) => apply_overrides(&mut settings, |key| values.get(key).cloned()),
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable settings file: {err}")
            }
        },
        Err(err) if config_path.is_some() => {
            tracing::warn!(path = %path.display(), "could not read settings file: {err}")
        }
        Err(_) => {}
    }

    apply_overrides(&mut settings, |key| {
        std::env::var(format!("{ENV_PREFIX}{}", key.to_ascii_uppercase())).ok()
    });

    settings
}

pub fn prepare_download_dir(settings: &Settings) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(&settings.download_dir).with_context(|| {
        format!(
            "failed to create download directory '{}'",
            settings.download_dir.display()
        )
    })?;
    Ok(settings.download_dir.clone())
}

/// Reads a flat `key = value` table; scalar values are kept as their text.
fn parse_file_values(raw: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table = toml::from_str::<toml::Table>(raw)?;
    Ok(table
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                toml::Value::String(text) => text,
                toml::Value::Integer(number) => number.to_string(),
                toml::Value::Float(number) => number.to_string(),
                toml::Value::Boolean(flag) => flag.to_string(),
                _ => return None,
            };
            Some((key, text))
        })
        .collect())
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("download_dir") {
        settings.download_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("default_query") {
        settings.default_query = v;
    }
    if let Some(parsed) = lookup("max_display_rows").and_then(|v| v.trim().parse().ok()) {
        settings.max_display_rows = parsed;
    }
    if let Some(parsed) = lookup("max_cell_width").and_then(|v| v.trim().parse().ok()) {
        settings.max_cell_width = parsed;
    }
    if let Some(parsed) = lookup("fetch_timeout_secs").and_then(|v| v.trim().parse().ok()) {
        settings.fetch_timeout_secs = parsed;
    }
}
