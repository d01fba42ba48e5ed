use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Bundled default config written by `afya init`
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AfyaConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorCliConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub google: GoogleProviderConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_google_model")]
    pub model: String,
    #[serde(default = "default_google_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_google_base_url")]
    pub base_url: String,
}

impl std::fmt::Debug for GoogleProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_google_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_google_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_google_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for GoogleProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_google_model(),
            max_tokens: default_google_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            base_url: default_google_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "~/.afya/afya.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_whatsapp_number")]
    pub whatsapp_number: String,
    #[serde(default = "default_whatsapp_base_url")]
    pub whatsapp_base_url: String,
}

fn default_whatsapp_number() -> String {
    afya_core::whatsapp::DEFAULT_SUPPORT_NUMBER.to_string()
}
fn default_whatsapp_base_url() -> String {
    afya_core::whatsapp::DEFAULT_BASE_URL.to_string()
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            whatsapp_number: default_whatsapp_number(),
            whatsapp_base_url: default_whatsapp_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorCliConfig {
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_history_window() -> usize {
    6
}

impl Default for OrchestratorCliConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

/// Mask a secret string for Debug output and logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".afya")
}

impl AfyaConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `afya init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if config.providers.google.api_key.starts_with("AIza") {
            warn!(
                "Gemini API key is hardcoded in config file. For security, use environment variables: api_key = \"${{GEMINI_API_KEY}}\""
            );
        }

        Ok(config)
    }

    /// Expand allowlisted env vars, then parse
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expanded)?)
    }

    /// Refuse to serve without an oracle key
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.providers.google.api_key.trim();
        if key.is_empty() {
            bail!(
                "providers.google.api_key is empty. Set GEMINI_API_KEY or edit {}",
                config_dir().join("config.toml").display()
            );
        }
        Ok(key)
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "AFYA_WHATSAPP_NUMBER",
    "AFYA_DB_PATH",
    "AFYA_BIND",
];

/// Replace `${VAR}` for allowlisted names using `lookup`; unset vars become empty
fn expand_env_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = lookup(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

/// Expand a leading `~/` to the home directory
pub fn shellexpand(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AfyaConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.providers.google.model, "gemini-2.0-flash");
        assert_eq!(config.orchestrator.history_window, 6);
        assert_eq!(config.escalation.whatsapp_base_url, "https://wa.me/");
        assert!(config.server.bind.parse::<std::net::SocketAddr>().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AfyaConfig::parse("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.store.db_path, "~/.afya/afya.db");
        assert_eq!(config.escalation.whatsapp_number, "254700000000");
        assert_eq!(config.providers.google.timeout_secs, 60);
        assert!((config.providers.google.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_require_api_key() {
        let mut config = AfyaConfig::default();
        assert!(config.require_api_key().is_err());

        config.providers.google.api_key = "   ".to_string();
        assert!(config.require_api_key().is_err());

        config.providers.google.api_key = "test-key".to_string();
        assert_eq!(config.require_api_key().unwrap(), "test-key");
    }

    fn fake_env(name: &str) -> Option<String> {
        match name {
            "AFYA_DB_PATH" => Some("/var/lib/afya/afya.db".to_string()),
            "GEMINI_API_KEY" => Some("key-from-env".to_string()),
            "HOME" => Some("/home/afya".to_string()),
            "USER" => Some("afya".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_skips_unlisted_vars() {
        let input = "api_key = \"${SOME_RANDOM_SECRET}\"";
        assert_eq!(expand_env_vars(input, fake_env), input);
    }

    #[test]
    fn test_expand_allowlisted_var() {
        assert_eq!(
            expand_env_vars("db_path = \"${AFYA_DB_PATH}\"", fake_env),
            "db_path = \"/var/lib/afya/afya.db\""
        );
        assert_eq!(expand_env_vars("bind = \"${AFYA_BIND}\"", fake_env), "bind = \"\"");
    }

    #[test]
    fn test_allowlist_is_exactly_the_documented_vars() {
        assert_eq!(
            ALLOWED_ENV_VARS,
            &["GEMINI_API_KEY", "AFYA_WHATSAPP_NUMBER", "AFYA_DB_PATH", "AFYA_BIND"]
        );
        // Set in the environment but not allowlisted
        assert_eq!(expand_env_vars("dir = \"${HOME}/${USER}\"", fake_env), "dir = \"${HOME}/${USER}\"");
    }

    #[test]
    fn test_expand_unterminated() {
        assert_eq!(
            expand_env_vars("a = \"${GEMINI_API_KEY\"", fake_env),
            "a = \"${GEMINI_API_KEY\""
        );
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("AIzaSyExampleKey1234"), "AIz...1234");
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut config = GoogleProviderConfig::default();
        config.api_key = "AIzaSyVerySecretValue9876".to_string();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("VerySecret"));
        assert!(debug.contains("AIz...9876"));
    }

    #[test]
    fn test_shellexpand() {
        assert_eq!(shellexpand("/tmp/afya.db"), PathBuf::from("/tmp/afya.db"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(shellexpand("~/.afya/afya.db"), home.join(".afya/afya.db"));
        }
    }
}
