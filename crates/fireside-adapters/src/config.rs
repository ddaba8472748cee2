//! Configuration management for fireside
//!
//! Stores settings in ~/.config/fireside/config.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OpenRouter API key. The OPENROUTER_API_KEY environment variable is the
    /// fallback when this is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model id override for completion calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Stable anonymous identifier sent as the provider's `user` field, so the
    /// same installation gets consistent routing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_user_id: Option<String>,
    /// Maximum characters per outbound message before the transport splits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_message_chars: Option<usize>,
}

impl Config {
    fn sanitize(&mut self) {
        if let Some(key) = &self.api_key {
            if key.trim().is_empty() {
                self.api_key = None;
            }
        }
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                self.model = None;
            }
        }
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fireside"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Self::default(),
        }
    }

    /// Load config from an explicit path, or return default. A corrupt file is
    /// backed up rather than silently overwritten.
    pub fn load_from_path(path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(path) {
            match serde_json::from_str::<Config>(&content) {
                Ok(mut config) => {
                    config.sanitize();
                    return config;
                }
                Err(_) => preserve_corrupt_config(path, &content),
            }
        }
        Self::default()
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), String> {
        let dir =
            Self::config_dir().ok_or_else(|| "Could not determine config directory".to_string())?;
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        self.save_to_path(&dir.join("config.json"))
    }

    /// Save config to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        let mut sanitized = self.clone();
        sanitized.sanitize();
        let content = serde_json::to_string_pretty(&sanitized)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        #[cfg(unix)]
        {
            write_config_atomic(path, &content).map_err(|e| format!("Failed to write config: {}", e))
        }
        #[cfg(not(unix))]
        {
            fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
        }
    }

    /// Get the API key (config file first, environment fallback).
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }

    /// Stable anonymous routing id, created and persisted on first use.
    pub fn routing_user(&mut self) -> Option<String> {
        if cfg!(test) {
            return None;
        }
        if let Some(id) = self.routing_user_id.clone() {
            return Some(id);
        }
        let id = format!("fireside_{}", Uuid::new_v4());
        self.routing_user_id = Some(id.clone());
        let _ = self.save();
        Some(id)
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/fireside/config.json".to_string())
    }
}

/// Keep a one-off backup of an unparseable config so the user can recover it.
fn preserve_corrupt_config(path: &Path, content: &str) {
    let backup = path.with_extension("json.corrupt");
    let _ = fs::write(backup, content);
}

#[cfg(unix)]
fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
