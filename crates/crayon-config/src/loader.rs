use std::path::{Path, PathBuf};

use crayon_common::{Error, Result};
use tracing::{debug, info, warn};

use crate::model::AppConfig;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Builds an [`AppConfig`] from dotenv files, an optional YAML file and the
/// process environment, in that order of increasing precedence.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_name: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_name: std::env::var("CRAYON_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_name(mut self, env_name: impl Into<String>) -> Self {
        self.env_name = env_name.into();
        self
    }

    pub fn load(&self) -> Result<AppConfig> {
        self.load_dotenv();

        let mut config = match self.resolve_config_path() {
            Some(path) => Self::read_file(&path)?,
            None => AppConfig::default(),
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load `.env.<env>` and then `.env`; values already set are not overwritten.
    pub fn load_dotenv(&self) {
        let env_file = format!(".env.{}", self.env_name);
        match dotenvy::from_filename(&env_file) {
            Ok(path) => info!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("no {env_file} file found"),
            Err(e) => warn!("failed to read {env_file}: {e}"),
        }
        match dotenvy::dotenv() {
            Ok(path) => info!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("no .env file found"),
            Err(e) => warn!("failed to read .env: {e}"),
        }
    }

    fn resolve_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }

    pub fn read_file(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Overlay credentials and a few tunables from the environment.
    pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("DISCORD_API_KEY") {
            config.discord.bot_token = Some(token);
        }
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(model) = non_empty("GEMINI_MODEL") {
            config.llm.model = model;
        }
        if let Some(path) = non_empty("CRAYON_SYSTEM_PROMPT_FILE") {
            config.agent.system_prompt_file = PathBuf::from(path);
        }
    }

    /// Read the persona prompt named by the config. A missing file is not an
    /// error; the caller falls back to its built-in prompt.
    pub fn read_system_prompt(config: &AppConfig) -> Option<String> {
        let path = &config.agent.system_prompt_file;
        match std::fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                warn!("system prompt file {} is empty", path.display());
                None
            }
            Err(e) => {
                warn!("could not read system prompt {}: {e}", path.display());
                None
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// Fail fast on settings the bot cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self
            .discord
            .bot_token
            .as_deref()
            .is_none_or(|t| t.trim().is_empty())
        {
            return Err(Error::Config(
                "discord bot token is not set (DISCORD_API_KEY)".into(),
            ));
        }
        self.validate_llm()
    }

    /// The subset of [`AppConfig::validate`] needed to talk to the model only.
    pub fn validate_llm(&self) -> Result<()> {
        if self
            .llm
            .api_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
        {
            return Err(Error::Config("gemini api key is not set (GEMINI_API_KEY)".into()));
        }
        if self.agent.history_window == 0 {
            return Err(Error::Config("agent.history_window must be at least 1".into()));
        }
        if self.agent.max_message_len == 0 {
            return Err(Error::Config("agent.max_message_len must be at least 1".into()));
        }
        Ok(())
    }
}
