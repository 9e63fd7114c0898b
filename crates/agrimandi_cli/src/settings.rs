use agrimandi_core::ChatConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads a TOML config file; missing keys keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<ChatConfig> {
    let Some(path) = path else {
        return Ok(ChatConfig::default());
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse config {}", path.display()))
}
