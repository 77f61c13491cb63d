//! Configuration: vault location from the environment, board settings from YAML.
//!
//! ```yaml
//! board: Boards/Work
//! query: project = ABC AND sprint in openSprints()
//! accounts:
//!   - alias: work
//!     base_url: https://example.atlassian.net
//!     email: me@example.com
//!     token_env: JIRA_TOKEN_WORK
//!     api: cloud          # or server; inferred from base_url when omitted
//! placement:
//!   "In Review": In Progress
//!   Closed: Done
//! done_marker: "**Complete**"
//! ticket_notes:
//!   folder: Jira
//!   template: Templates/Ticket
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kanban_core::{is_column_name, PlacementMap, Reconciler, DEFAULT_DONE_MARKER};
use serde::Deserialize;

const VAULT_ENV: &str = "OBSIDIAN_VAULT_PATH";
const CONFIG_DIR: &str = "kanban-sync";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OBSIDIAN_VAULT_PATH environment variable not set and no --vault given")]
    MissingVaultPath,

    #[error("Vault directory does not exist: {0}")]
    VaultNotFound(PathBuf),

    #[error("No platform config directory; pass --config")]
    NoConfigDir,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// One Jira site to query.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    /// Short name used in logs
    pub alias: String,
    /// Site root: "https://example.atlassian.net"
    pub base_url: String,
    pub email: String,
    /// Name of the environment variable holding the API token
    pub token_env: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub api: JiraApi,
}

/// Which search endpoint an account speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JiraApi {
    /// Cloud for `*.atlassian.net` hosts, Server otherwise
    #[default]
    Auto,
    /// `/rest/api/3/search/jql`, paged by `nextPageToken`
    Cloud,
    /// `/rest/api/2/search`, paged by `startAt`
    Server,
}

impl JiraApi {
    /// Settle `Auto` against the account's site root.
    pub fn resolve(self, base_url: &str) -> Self {
        match self {
            Self::Auto => {
                let host = base_url
                    .split("://")
                    .last()
                    .unwrap_or(base_url)
                    .split(['/', ':'])
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                if host.ends_with(".atlassian.net") {
                    Self::Cloud
                } else {
                    Self::Server
                }
            }
            other => other,
        }
    }
}

fn default_page_size() -> u32 {
    100
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketNotesConfig {
    /// Vault folder for ticket notes; the vault root when empty
    #[serde(default)]
    pub folder: String,
    /// Vault URI of a template note
    #[serde(default)]
    pub template: Option<String>,
}

/// Contents of the YAML config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    /// Vault URI of the board note
    pub board: String,
    /// JQL run against every account
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub placement: PlacementMap,
    #[serde(default = "default_done_marker")]
    pub done_marker: String,
    #[serde(default)]
    pub ticket_notes: Option<TicketNotesConfig>,
}

fn default_done_marker() -> String {
    DEFAULT_DONE_MARKER.to_string()
}

impl BoardConfig {
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.board.trim().is_empty() {
            return Err(ConfigError::Invalid("`board` must name a note".into()));
        }
        if self.done_marker.trim().is_empty() || self.done_marker.contains(['\n', '\r']) {
            return Err(ConfigError::Invalid(
                "`done_marker` must be a single non-blank line".into(),
            ));
        }
        for (status, column) in self.placement.iter() {
            if !is_column_name(column) {
                return Err(ConfigError::Invalid(format!(
                    "placement for '{}' must be a single-line column name",
                    status
                )));
            }
        }
        if !self.accounts.is_empty() && self.query.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "`query` is required when accounts are configured".into(),
            ));
        }

        let mut aliases = HashSet::new();
        for account in &self.accounts {
            if !aliases.insert(account.alias.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate account alias '{}'",
                    account.alias
                )));
            }
            if account.page_size == 0 {
                return Err(ConfigError::Invalid(format!(
                    "account '{}': page_size must be positive",
                    account.alias
                )));
            }
        }
        Ok(())
    }

    /// Engine configured with this board's placement map and done marker.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.placement.clone()).with_done_marker(&self.done_marker)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub vault_path: PathBuf,
    pub config_path: PathBuf,
    pub board: BoardConfig,
}

impl Config {
    /// Resolve the vault and load the board config.
    ///
    /// `vault` falls back to `OBSIDIAN_VAULT_PATH`; `config_path` falls back to
    /// `<config dir>/kanban-sync/config.yaml`. Both support `~`.
    pub fn load(vault: Option<&str>, config_path: Option<&str>) -> Result<Self, ConfigError> {
        let vault_path = match vault {
            Some(v) => expand_tilde(v),
            None => {
                let v = std::env::var(VAULT_ENV).map_err(|_| ConfigError::MissingVaultPath)?;
                expand_tilde(&v)
            }
        };
        if !vault_path.is_dir() {
            return Err(ConfigError::VaultNotFound(vault_path));
        }

        let config_path = match config_path {
            Some(p) => expand_tilde(p),
            None => default_config_path()?,
        };
        let yaml = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let board = BoardConfig::from_yaml(&yaml, &config_path)?;

        Ok(Self {
            vault_path,
            config_path,
            board,
        })
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoConfigDir)
}

/// Expand ~ or ~/ prefix to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    }
}
