use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::protocol::DEFAULT_COMPARE_ENDPOINT;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "facecheck.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub request_timeout_secs: Option<u64>,
    pub locale_file: Option<PathBuf>,
    pub color: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPARE_ENDPOINT.into(),
            request_timeout_secs: None,
            locale_file: None,
            color: true,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    endpoint: Option<String>,
    request_timeout_secs: Option<u64>,
    locale_file: Option<PathBuf>,
    color: Option<bool>,
    log_filter: Option<String>,
}

/// Defaults, then the settings file (if present), then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.endpoint = validate_endpoint(&settings.endpoint)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.endpoint {
        settings.endpoint = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
    if let Some(v) = file_cfg.locale_file {
        settings.locale_file = Some(v);
    }
    if let Some(v) = file_cfg.color {
        settings.color = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("FACECHECK_ENDPOINT") {
        settings.endpoint = v;
    }
    if let Some(v) = lookup("APP__ENDPOINT") {
        settings.endpoint = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }

    if let Some(v) = lookup("APP__LOCALE_FILE") {
        settings.locale_file = Some(PathBuf::from(v));
    }

    if let Some(v) = lookup("APP__COLOR") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => settings.color = true,
            "0" | "false" | "no" | "off" => settings.color = false,
            _ => {}
        }
    }
    if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        settings.color = false;
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn validate_endpoint(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).with_context(|| format!("invalid endpoint url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("endpoint '{raw}' must use http or https");
    }
    if url.host_str().is_none() {
        bail!("endpoint '{raw}' has no host");
    }
    Ok(raw.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
