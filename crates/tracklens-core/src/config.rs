//! Configuration management for tracklens.
//!
//! Handles loading and saving configuration from TOML files.
//! Config files are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/tracklens/config.toml`
//! - **Windows**: `%APPDATA%\tracklens\config.toml`
//!
//! Tokens are never written to the file. They are read from `GITLAB_TOKEN`
//! and `JIRA_API_TOKEN` at startup. Non-secret fields can be overridden from
//! the environment as well (`GITLAB_URL`, `JIRA_EMAIL`, ...).
//!
//! # Example
//!
//! ```ignore
//! use tracklens_core::config::Config;
//!
//! let mut config = Config::load()?.with_env_overrides();
//! config.set("jira.url", "https://acme.atlassian.net")?;
//! config.save()?;
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "tracklens";

/// Environment variable holding the GitLab personal access token.
pub const GITLAB_TOKEN_ENV: &str = "GITLAB_TOKEN";

/// Environment variable holding the Jira API token (or `user:password`).
pub const JIRA_TOKEN_ENV: &str = "JIRA_API_TOKEN";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// GitLab configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<GitLabConfig>,

    /// Jira configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraConfig>,
}

/// GitLab provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// GitLab instance URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,
    /// Project ID (numeric or path)
    pub project_id: String,
}

/// Jira provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Jira instance URL
    pub url: String,
    /// User email (Basic auth on Cloud)
    pub email: String,
    /// Default project key used when a search names no project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// A provider section is created only when its identifying fields
    /// (`GITLAB_PROJECT_ID`, or `JIRA_URL` + `JIRA_EMAIL`) become available.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gitlab_url = var("GITLAB_URL");
        let gitlab_project = var("GITLAB_PROJECT_ID");
        match self.gitlab.as_mut() {
            Some(gitlab) => {
                if let Some(url) = gitlab_url {
                    gitlab.url = url;
                }
                if let Some(project_id) = gitlab_project {
                    gitlab.project_id = project_id;
                }
            }
            None => {
                if let Some(project_id) = gitlab_project {
                    self.gitlab = Some(GitLabConfig {
                        url: gitlab_url.unwrap_or_else(default_gitlab_url),
                        project_id,
                    });
                }
            }
        }

        let jira_url = var("JIRA_URL");
        let jira_email = var("JIRA_EMAIL");
        let jira_project = var("JIRA_PROJECT_KEY");
        match self.jira.as_mut() {
            Some(jira) => {
                if let Some(url) = jira_url {
                    jira.url = url;
                }
                if let Some(email) = jira_email {
                    jira.email = email;
                }
                if jira_project.is_some() {
                    jira.project_key = jira_project;
                }
            }
            None => {
                if let (Some(url), Some(email)) = (jira_url, jira_email) {
                    self.jira = Some(JiraConfig {
                        url,
                        email,
                        project_key: jira_project,
                    });
                }
            }
        }

        self
    }

    /// Check if any provider is configured.
    pub fn has_any_provider(&self) -> bool {
        self.gitlab.is_some() || self.jira.is_some()
    }

    /// Get a list of configured provider names.
    pub fn configured_providers(&self) -> Vec<&'static str> {
        let mut providers = Vec::new();
        if self.gitlab.is_some() {
            providers.push("gitlab");
        }
        if self.jira.is_some() {
            providers.push("jira");
        }
        providers
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g., `jira.email`, `gitlab.url`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (provider, field) = split_key(key)?;

        match provider {
            "gitlab" => {
                let config = self.gitlab.get_or_insert_with(|| GitLabConfig {
                    url: default_gitlab_url(),
                    project_id: String::new(),
                });
                match field {
                    "url" => config.url = value.to_string(),
                    "project_id" | "project" => config.project_id = value.to_string(),
                    _ => return Err(unknown_field("GitLab", field)),
                }
            }
            "jira" => {
                let config = self.jira.get_or_insert_with(|| JiraConfig {
                    url: String::new(),
                    email: String::new(),
                    project_key: None,
                });
                match field {
                    "url" => config.url = value.to_string(),
                    "email" => config.email = value.to_string(),
                    "project_key" | "project" => config.project_key = Some(value.to_string()),
                    _ => return Err(unknown_field("Jira", field)),
                }
            }
            _ => {
                return Err(Error::Config(format!("Unknown provider: {}", provider)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g., `jira.email`, `gitlab.url`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (provider, field) = split_key(key)?;

        match provider {
            "gitlab" => {
                let Some(config) = &self.gitlab else {
                    return Ok(None);
                };
                match field {
                    "url" => Ok(Some(config.url.clone())),
                    "project_id" | "project" => Ok(Some(config.project_id.clone())),
                    _ => Err(unknown_field("GitLab", field)),
                }
            }
            "jira" => {
                let Some(config) = &self.jira else {
                    return Ok(None);
                };
                match field {
                    "url" => Ok(Some(config.url.clone())),
                    "email" => Ok(Some(config.email.clone())),
                    "project_key" | "project" => Ok(config.project_key.clone()),
                    _ => Err(unknown_field("Jira", field)),
                }
            }
            _ => Err(Error::Config(format!("Unknown provider: {}", provider))),
        }
    }
}

/// Read a token from the environment.
pub fn token_from_env(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("Missing token: set the {} environment variable", var)))
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('.') {
        Some((provider, field)) if !field.contains('.') && !provider.is_empty() => {
            Ok((provider, field))
        }
        _ => Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: provider.field",
            key
        ))),
    }
}

fn unknown_field(provider: &str, field: &str) -> Error {
    Error::Config(format!("Unknown {} config field: {}", provider, field))
}

// =============================================================================
// Tests
// =============================================================================
