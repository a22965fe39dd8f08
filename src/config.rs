//! Application configuration.
//!
//! One JSON file under the user config dir holding the selected storage
//! provider, the naming templates and the optional cipher password. Saved
//! configs are merged over the defaults key by key, so a partial or older
//! file never loses fields it does not mention.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::providers::ProviderSettings;
use crate::template::Template;

/// Web Image Categorizer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WicConfig {
    /// Storage provider to upload to, none until the user picks one
    #[serde(default)]
    pub provider: Option<ProviderSettings>,
    /// Naming templates, evaluated top to bottom
    #[serde(default)]
    pub templates: Vec<Template>,
    /// Password for payload encryption when a template asks for it
    #[serde(default)]
    pub cipher_password: Option<String>,
}

/// Get the path to the config file
pub fn default_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
    config_dir.join("wic").join("config.json")
}

/// Merge a saved config value over the defaults.
///
/// Unknown keys in the saved value are ignored, missing keys keep their
/// default, and anything that is not a JSON object leaves the defaults
/// untouched.
pub fn merge_config(defaults: WicConfig, saved: Option<&serde_json::Value>) -> WicConfig {
    let Some(saved_obj) = saved.and_then(|v| v.as_object()) else {
        return defaults;
    };

    let mut base = match serde_json::to_value(&defaults) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => return defaults,
    };
    for (key, value) in saved_obj {
        base.insert(key.clone(), value.clone());
    }

    serde_json::from_value(serde_json::Value::Object(base)).unwrap_or(defaults)
}

/// Load configuration from the default location
pub fn load_config() -> WicConfig {
    load_config_from(&default_config_path())
}

/// Load configuration from a specific file, falling back to defaults when
/// the file is missing or unreadable
pub fn load_config_from(path: &Path) -> WicConfig {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(saved) => return merge_config(WicConfig::default(), Some(&saved)),
                Err(e) => {
                    tracing::warn!("Failed to parse config: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config: {}", e);
            }
        }
    }

    WicConfig::default()
}

/// Save configuration to the default location
pub fn save_config(config: &WicConfig) -> Result<(), String> {
    save_config_to(&default_config_path(), config)
}

/// Save configuration to a specific file
pub fn save_config_to(path: &Path, config: &WicConfig) -> Result<(), String> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;

    tracing::info!("Config saved to {:?}", path);
    Ok(())
}
