//! Configuration management for adomigrate

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::retry::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::client::session::DEFAULT_API_VERSION;
use crate::client::{AdoEndpoint, GitLabEndpoint, RetryPolicy, SessionConfig, TlsPolicy};
use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Azure DevOps organization or collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ado: Option<AdoConfig>,

    /// GitLab instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<GitLabConfig>,

    /// Certificate validation policy
    #[serde(default)]
    pub tls: TlsPolicy,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Redact credentials in logs and error messages
    #[serde(default = "default_true")]
    pub mask_secrets: bool,

    /// Log one line per REST call
    #[serde(default)]
    pub log_calls: bool,
}

/// Azure DevOps connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoConfig {
    pub base_url: String,

    /// Personal access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,
}

/// GitLab connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitLabConfig {
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_initial_delay_secs() -> u64 {
    DEFAULT_INITIAL_DELAY.as_secs()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ado: None,
            gitlab: None,
            tls: TlsPolicy::default(),
            retry: RetryConfig::default(),
            mask_secrets: true,
            log_calls: false,
        }
    }
}

/// Values supplied on the command line or through the environment.
///
/// Precedence: CLI flag > environment variable > config file > default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ado_url: Option<String>,
    pub ado_pat: Option<String>,
    pub gitlab_url: Option<String>,
    pub gitlab_token: Option<String>,
    /// Force the permissive certificate policy
    pub insecure: bool,
    /// Force call logging on
    pub log_calls: bool,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".adomigrate").join("config.yaml"))
    }

    /// The explicit path if given, otherwise the default
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from `path` (or the default location). A missing
    /// file yields the defaults so environment-only setups work.
    pub fn load_or_default_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            log::debug!("No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to `path` (or the default location)
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(&Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Credentials live here
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Layer CLI/environment values over the file
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.ado_url {
            match &mut self.ado {
                Some(ado) => ado.base_url = url.clone(),
                None => {
                    self.ado = Some(AdoConfig {
                        base_url: url.clone(),
                        pat: None,
                        api_version: default_api_version(),
                    })
                }
            }
        }
        if let (Some(pat), Some(ado)) = (&overrides.ado_pat, &mut self.ado) {
            ado.pat = Some(pat.clone());
        }

        if let Some(url) = &overrides.gitlab_url {
            match &mut self.gitlab {
                Some(gitlab) => gitlab.base_url = url.clone(),
                None => {
                    self.gitlab = Some(GitLabConfig {
                        base_url: url.clone(),
                        token: None,
                    })
                }
            }
        }
        if let (Some(token), Some(gitlab)) = (&overrides.gitlab_token, &mut self.gitlab) {
            gitlab.token = Some(token.clone());
        }

        if overrides.insecure {
            self.tls = TlsPolicy::Permissive;
        }
        if overrides.log_calls {
            self.log_calls = true;
        }
    }

    /// Check values that would otherwise fail later in confusing ways
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()).into());
        }
        if let Some(ado) = &self.ado {
            check_url("ado.base_url", &ado.base_url)?;
            if ado.api_version.trim().is_empty() {
                return Err(ConfigError::Invalid("ado.api_version must not be empty".to_string()).into());
            }
        }
        if let Some(gitlab) = &self.gitlab {
            check_url("gitlab.base_url", &gitlab.base_url)?;
        }
        Ok(())
    }

    /// The Azure DevOps section, with a token
    pub fn require_ado(&self) -> Result<&AdoConfig> {
        let ado = self.ado.as_ref().ok_or(ConfigError::MissingAdo)?;
        match ado.pat.as_deref() {
            Some(pat) if !pat.is_empty() => Ok(ado),
            _ => Err(ConfigError::MissingAdoPat.into()),
        }
    }

    /// The GitLab section, with a token
    pub fn require_gitlab(&self) -> Result<&GitLabConfig> {
        match &self.gitlab {
            Some(gitlab) if gitlab.token.as_deref().is_some_and(|t| !t.is_empty()) => Ok(gitlab),
            _ => Err(ConfigError::MissingGitLab.into()),
        }
    }

    /// Freeze into the session configuration used by the client. Sections
    /// without credentials are left out.
    pub fn to_session(&self) -> SessionConfig {
        let ado = self.ado.as_ref().and_then(|ado| {
            ado.pat.as_ref().filter(|pat| !pat.is_empty()).map(|pat| AdoEndpoint {
                base_url: ado.base_url.clone(),
                pat: pat.clone(),
                api_version: ado.api_version.clone(),
            })
        });
        let gitlab = self.gitlab.as_ref().and_then(|gitlab| {
            gitlab
                .token
                .as_ref()
                .filter(|token| !token.is_empty())
                .map(|token| GitLabEndpoint {
                    base_url: gitlab.base_url.clone(),
                    token: token.clone(),
                })
        });

        SessionConfig {
            ado,
            gitlab,
            tls: self.tls,
            retry: RetryPolicy::new(
                self.retry.max_attempts,
                Duration::from_secs(self.retry.initial_delay_secs),
            ),
            mask_secrets: self.mask_secrets,
            log_calls: self.log_calls,
        }
    }
}

fn check_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be an http(s) URL, got '{}'", field, url)).into())
    }
}
