use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".ticket-review.toml";

const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_MODEL_NAME: &str = "llama3";
const DEFAULT_MODEL_HOST: &str = "http://localhost:11434";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Process-wide configuration, read once at startup.
///
/// Every field is optional: a missing Jira or GitHub value only disables
/// the source that needs it, and model settings fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfig {
    /// Account email used for Basic auth. Falls back to JIRA_EMAIL.
    pub email: Option<String>,
    /// API token used for Basic auth. Falls back to JIRA_API_TOKEN.
    pub api_token: Option<String>,
    /// Bare host (`company.atlassian.net`) or full base URL. Falls back to JIRA_DOMAIN.
    pub domain: Option<String>,
}

/// Resolved Jira credentials; only exists when all three values are present.
#[derive(Debug, Clone)]
pub struct JiraCredentials {
    pub email: String,
    pub api_token: String,
    pub base_url: String,
}

impl JiraConfig {
    pub fn credentials(&self) -> Option<JiraCredentials> {
        let email = present(&self.email)?;
        let api_token = present(&self.api_token)?;
        let domain = present(&self.domain)?;

        let base_url = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", domain.trim_end_matches('/'))
        };

        Some(JiraCredentials {
            email: email.to_string(),
            api_token: api_token.to_string(),
            base_url,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// Access token. Falls back to GITHUB_TOKEN.
    pub token: Option<String>,
    /// Account or organization owning the repositories. Falls back to GITHUB_OWNER.
    pub owner: Option<String>,
    #[serde(default = "default_github_api")]
    pub api_base: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            api_base: default_github_api(),
        }
    }
}

impl GitHubConfig {
    pub fn token(&self) -> Option<&str> {
        present(&self.token)
    }

    pub fn owner(&self) -> Option<&str> {
        present(&self.owner)
    }
}

/// Settings for the local completion backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    /// Model weights to serve. Falls back to MODEL_NAME, then `llama3`.
    pub name: Option<String>,
    /// Sampling temperature in [0, 2]. Falls back to MODEL_TEMPERATURE.
    pub temperature: Option<f32>,
    /// Extra attempts after the first on transient failures. Falls back to MODEL_MAX_RETRIES.
    pub max_retries: Option<u32>,
    /// Backend base URL. Falls back to OLLAMA_HOST.
    pub host: Option<String>,
    pub retry_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

impl ModelConfig {
    pub fn name(&self) -> &str {
        present(&self.name).unwrap_or(DEFAULT_MODEL_NAME)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn host(&self) -> &str {
        present(&self.host)
            .unwrap_or(DEFAULT_MODEL_HOST)
            .trim_end_matches('/')
    }

    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

impl Config {
    /// Load configuration from `path`, or from `.ticket-review.toml` in the
    /// current directory when no path is given (a missing default file means
    /// an empty config). Environment variables then fill any unset values.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset values from `lookup`. Values already present in the file win.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        fill(&mut self.jira.email, || lookup("JIRA_EMAIL"));
        fill(&mut self.jira.api_token, || lookup("JIRA_API_TOKEN"));
        fill(&mut self.jira.domain, || lookup("JIRA_DOMAIN"));
        fill(&mut self.github.token, || lookup("GITHUB_TOKEN"));
        fill(&mut self.github.owner, || lookup("GITHUB_OWNER"));
        fill(&mut self.model.name, || lookup("MODEL_NAME"));
        fill(&mut self.model.host, || lookup("OLLAMA_HOST"));

        if self.model.temperature.is_none() {
            if let Some(raw) = lookup("MODEL_TEMPERATURE") {
                self.model.temperature = Some(parse_number("MODEL_TEMPERATURE", &raw)?);
            }
        }
        if self.model.max_retries.is_none() {
            if let Some(raw) = lookup("MODEL_MAX_RETRIES") {
                self.model.max_retries = Some(parse_number("MODEL_MAX_RETRIES", &raw)?);
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let temperature = self.model.temperature();
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "model.temperature".to_string(),
                reason: format!("{} is outside [0, 2]", temperature),
            });
        }
        Ok(())
    }
}

fn default_github_api() -> String {
    DEFAULT_GITHUB_API.to_string()
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn fill<F>(slot: &mut Option<String>, fallback: F)
where
    F: FnOnce() -> Option<String>,
{
    if present(slot).is_none() {
        *slot = fallback();
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.jira.credentials().is_none());
        assert!(config.github.token().is_none());
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.model.name(), "llama3");
        assert_eq!(config.model.max_retries(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[jira]
email = "dev@example.com"
api_token = "secret"
domain = "example.atlassian.net"

[github]
owner = "acme"

[model]
name = "mistral"
temperature = 0.0
max_retries = 4
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let creds = config.jira.credentials().unwrap();
        assert_eq!(creds.base_url, "https://example.atlassian.net");
        assert_eq!(config.github.owner(), Some("acme"));
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.model.name(), "mistral");
        assert_eq!(config.model.temperature(), 0.0);
        assert_eq!(config.model.max_retries(), 4);
    }

    #[test]
    fn test_env_fills_unset_values_only() {
        let mut config: Config = toml::from_str("[github]\nowner = \"from-file\"\n").unwrap();
        config
            .apply_env(env(&[
                ("GITHUB_OWNER", "from-env"),
                ("GITHUB_TOKEN", "ghp_token"),
                ("JIRA_EMAIL", "dev@example.com"),
                ("JIRA_API_TOKEN", "t"),
                ("JIRA_DOMAIN", "http://127.0.0.1:9999/"),
                ("MODEL_TEMPERATURE", "1.5"),
            ]))
            .unwrap();

        assert_eq!(config.github.owner(), Some("from-file"));
        assert_eq!(config.github.token(), Some("ghp_token"));
        assert_eq!(
            config.jira.credentials().unwrap().base_url,
            "http://127.0.0.1:9999"
        );
        assert_eq!(config.model.temperature(), 1.5);
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("JIRA_EMAIL", "dev@example.com"),
                ("JIRA_API_TOKEN", "  "),
                ("JIRA_DOMAIN", "example.atlassian.net"),
            ]))
            .unwrap();
        assert!(config.jira.credentials().is_none());
    }

    #[test]
    fn test_invalid_numeric_env_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("MODEL_MAX_RETRIES", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("MODEL_MAX_RETRIES"));
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = Config::default();
        config.model.temperature = Some(2.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.toml");
        std::fs::write(&path, "[model]\nhost = \"http://gpu-box:11434/\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model.host(), "http://gpu-box:11434");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::FileRead(_))
        ));
    }
}
