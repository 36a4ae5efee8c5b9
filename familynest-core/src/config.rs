//! Configuration management
//!
//! Settings live in `settings.json` in the FamilyNest directory:
//! ```json
//! {
//!   "app": { "mockMode": false, "apiBaseUrl": "http://localhost:8080/api", "requestTimeoutSecs": 30 }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::http::DEFAULT_TIMEOUT_SECS;

/// Default account service base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    mock_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// FamilyNest configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Use the in-memory account service instead of the HTTP API
    pub mock_mode: bool,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mock_mode: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn read_settings(app_dir: &Path) -> Result<SettingsFile> {
    let settings_path = app_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unreadable settings.json");
        SettingsFile::default()
    }))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the FamilyNest directory
    ///
    /// Environment overrides (for CI/testing):
    /// - `FAMILYNEST_MOCK_MODE`
    /// - `FAMILYNEST_API_URL`
    pub fn load(app_dir: &Path) -> Result<Self> {
        let raw = read_settings(app_dir)?;
        let defaults = Self::default();

        let mock_mode = std::env::var("FAMILYNEST_MOCK_MODE")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(raw.app.mock_mode);

        let api_base_url = std::env::var("FAMILYNEST_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(raw.app.api_base_url)
            .unwrap_or(defaults.api_base_url);

        let request_timeout_secs = raw
            .app
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.request_timeout_secs);

        Ok(Self {
            mock_mode,
            api_base_url,
            request_timeout_secs,
        })
    }

    /// Save config to the FamilyNest directory
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let mut settings = read_settings(app_dir)?;

        settings.app.mock_mode = self.mock_mode;
        settings.app.api_base_url = Some(self.api_base_url.clone());
        settings.app.request_timeout_secs = Some(self.request_timeout_secs);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(app_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn enable_mock_mode(&mut self) {
        self.mock_mode = true;
    }

    pub fn disable_mock_mode(&mut self) {
        self.mock_mode = false;
    }
}
