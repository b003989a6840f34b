use std::{collections::HashMap, fs};

use api_client::DEFAULT_API_BASE;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub bearer_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.into(),
            bearer_token: None,
        }
    }
}

/// Defaults, overridden by `shelterfront.toml`, overridden by environment.
/// Credentials only ever enter here; they are never part of an endpoint
/// name or URL.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("shelterfront.toml") {
        apply_file_overrides(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Ok(v) = std::env::var("API_BEARER_TOKEN") {
        settings.bearer_token = Some(v);
    }
    if let Ok(v) = std::env::var("APP__API_BEARER_TOKEN") {
        settings.bearer_token = Some(v);
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("api_base_url") {
            settings.api_base_url = v.clone();
        }
        if let Some(v) = file_cfg.get("bearer_token") {
            settings.bearer_token = Some(v.clone());
        }
    }
}
