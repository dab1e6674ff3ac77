//! Top-level application configuration.
//!
//! Configuration is stored in `.ticketsync/config.yaml` and includes:
//! - Jira connection settings and credentials
//! - The default project key and conflict strategy
//! - Field mapping between local custom fields and Jira field IDs

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::paths;
use crate::sync::Strategy;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Jira connection settings
    #[serde(default)]
    pub jira: JiraConfig,

    /// Default project key used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Strategy applied when both sides of a ticket changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_strategy: Option<Strategy>,

    /// Remote operation timeout in seconds (default: 30)
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jira: JiraConfig::default(),
            project: None,
            conflict_strategy: None,
            remote_timeout: default_remote_timeout(),
        }
    }
}

fn default_remote_timeout() -> u64 {
    30
}

fn default_issue_type() -> String {
    "Story".to_string()
}

fn default_subtask_type() -> String {
    "Sub-task".to_string()
}

/// Jira connection configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://example.atlassian.net`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Issue type used when creating tickets
    #[serde(default = "default_issue_type")]
    pub issue_type: String,

    /// Issue type used when creating tasks
    #[serde(default = "default_subtask_type")]
    pub subtask_type: String,

    /// Jira field holding acceptance criteria, one criterion per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria_field: Option<String>,

    /// Local custom field name -> Jira field ID
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: None,
            email: None,
            api_token: None,
            issue_type: default_issue_type(),
            subtask_type: default_subtask_type(),
            acceptance_criteria_field: None,
            fields: HashMap::new(),
        }
    }
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfig")
            .field("url", &self.url)
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("issue_type", &self.issue_type)
            .field("subtask_type", &self.subtask_type)
            .field("acceptance_criteria_field", &self.acceptance_criteria_field)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Config {
    /// Load configuration from the default location, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Load configuration from a specific file, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Get the Jira API token from environment variable or config
    pub fn jira_api_token(&self) -> Option<String> {
        if let Ok(token) = env::var("JIRA_API_TOKEN") {
            if !token.is_empty() {
                return Some(token);
            }
        }

        self.jira.api_token.clone()
    }

    /// Resolve the project key, preferring an explicit value over the configured default
    pub fn project_key(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.project.clone())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                SyncError::Config(
                    "No project configured. Pass --project or set `project` in .ticketsync/config.yaml"
                        .to_string(),
                )
            })
    }
}
