use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_APP_NAME: &str = "My To-Do List";
const DEFAULT_ICON: &str = "appointment-soon";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    #[serde(default = "default_native_enabled")]
    pub native_enabled: bool,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default = "default_icon")]
    pub icon: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            native_enabled: default_native_enabled(),
            program: None,
            icon: default_icon(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            app_name: default_app_name(),
            notifications: NotificationConfig::default(),
        }
    }
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_native_enabled() -> bool {
    true
}

fn default_icon() -> Option<String> {
    Some(DEFAULT_ICON.to_string())
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let raw = read_config(&config_dir.join(APP_JSON))?;
    let mut config: AppConfig = serde_json::from_value(raw)?;

    let app_name = config.app_name.trim();
    config.app_name = if app_name.is_empty() {
        default_app_name()
    } else {
        app_name.to_string()
    };
    config.notifications.program = config
        .notifications
        .program
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);
    config.notifications.icon = config
        .notifications
        .icon
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    Ok(config)
}
