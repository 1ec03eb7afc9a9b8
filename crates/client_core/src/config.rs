use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "freight.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub backend_url: String,
    pub session_database_url: String,
    /// Chain the wallet is expected to be connected to.
    pub chain_id: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".into(),
            session_database_url: "sqlite://./data/freight_session.db".into(),
            chain_id: 80002,
        }
    }
}

impl Settings {
    pub fn backend_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.backend_url)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional TOML file, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, env);

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!("config: ignoring unreadable settings file: {err}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("backend_url").and_then(toml::Value::as_str) {
        settings.backend_url = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("session_database_url")
        .and_then(toml::Value::as_str)
    {
        settings.session_database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("chain_id").and_then(toml::Value::as_integer) {
        match u64::try_from(v) {
            Ok(chain_id) => settings.chain_id = chain_id,
            Err(_) => warn!("config: ignoring negative chain_id {v}"),
        }
    }
}

fn apply_env_overrides(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("FREIGHT_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = env("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = env("FREIGHT_SESSION_DB") {
        settings.session_database_url = v;
    }
    if let Some(v) = env("APP__SESSION_DB") {
        settings.session_database_url = v;
    }

    if let Some(v) = env("APP__CHAIN_ID") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.chain_id = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
