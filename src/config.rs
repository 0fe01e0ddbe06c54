use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigValidationError;

/// Bot runtime configuration. The credential is required and non-empty;
/// anything else is a hard validation failure, never a logged-and-ignored
/// one.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    pub api_key: String,
}

impl BotConfig {
    fn validate(&self) -> Result<()> {
        if self.discord.api_key.trim().is_empty() {
            return Err(ConfigValidationError::new("discord.api_key must not be empty").into());
        }
        Ok(())
    }
}

pub fn load_bot_config(path: &Path) -> Result<BotConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;

    let config: BotConfig = serde_yaml::from_str(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        ConfigValidationError::new(format!("{error} (at {location})"))
    })?;

    config.validate()?;
    Ok(config)
}
