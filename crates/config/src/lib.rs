//! Configuration loading, validation, and management for the outreach agent.
//!
//! Loads configuration from `~/.outreach/config.toml` with environment
//! variable overrides. Validates all settings at startup. Missing
//! credentials are not an error: the tier (or discovery step) that needs
//! them is dropped and reported instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.outreach/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Primary generation backend (GigaChat)
    #[serde(default)]
    pub primary: PrimaryConfig,

    /// Secondary generation backend (Hugging Face inference)
    #[serde(default)]
    pub secondary: SecondaryConfig,

    /// Knowledge index and embedding settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Messaging account used for target discovery
    #[serde(default)]
    pub account: AccountConfig,

    /// Outreach loop settings
    #[serde(default)]
    pub campaign: CampaignConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PrimaryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// GigaChat authorization key (base64 of `client_id:client_secret`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_gigachat_base_url")]
    pub base_url: String,

    #[serde(default = "default_gigachat_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Verify TLS certificates. Disable only in constrained environments.
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_scope() -> String {
    "GIGACHAT_API_PERS".into()
}
fn default_auth_url() -> String {
    "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".into()
}
fn default_gigachat_base_url() -> String {
    "https://gigachat.devices.sberbank.ru/api/v1".into()
}
fn default_gigachat_model() -> String {
    "GigaChat".into()
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials: None,
            scope: default_scope(),
            auth_url: default_auth_url(),
            base_url: default_gigachat_base_url(),
            model: default_gigachat_model(),
            temperature: default_temperature(),
            verify_tls: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for PrimaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryConfig")
            .field("enabled", &self.enabled)
            .field("credentials", &redact(&self.credentials))
            .field("scope", &self.scope)
            .field("auth_url", &self.auth_url)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("verify_tls", &self.verify_tls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Hugging Face inference pipeline task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferenceTask {
    Summarization,
    TextGeneration,
    Text2textGeneration,
}

impl InferenceTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceTask::Summarization => "summarization",
            InferenceTask::TextGeneration => "text-generation",
            InferenceTask::Text2textGeneration => "text2text-generation",
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SecondaryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hugging Face access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_hf_model")]
    pub model: String,

    #[serde(default = "default_hf_task")]
    pub task: InferenceTask,

    #[serde(default = "default_hf_base_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Output length budget
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_hf_model() -> String {
    "facebook/bart-large-cnn".into()
}
fn default_hf_task() -> InferenceTask {
    InferenceTask::Summarization
}
fn default_hf_base_url() -> String {
    "https://router.huggingface.co/hf-inference".into()
}
fn default_max_new_tokens() -> u32 {
    100
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: None,
            model: default_hf_model(),
            task: default_hf_task(),
            base_url: default_hf_base_url(),
            temperature: default_temperature(),
            max_new_tokens: default_max_new_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for SecondaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryConfig")
            .field("enabled", &self.enabled)
            .field("token", &redact(&self.token))
            .field("model", &self.model)
            .field("task", &self.task)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_new_tokens", &self.max_new_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Which embedder builds and queries the knowledge index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Local feature hashing, no network
    Hash,
    /// Hosted sentence-transformer via the Hugging Face feature-extraction pipeline
    Huggingface,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// JSON file read by `ingest`
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,

    #[serde(default = "default_embedder")]
    pub embedder: EmbedderKind,

    /// Model id for the hosted embedder
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Vector size for the hash embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./knowledge_index")
}
fn default_source_path() -> PathBuf {
    PathBuf::from("./products.json")
}
fn default_embedder() -> EmbedderKind {
    EmbedderKind::Hash
}
fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".into()
}
fn default_dimensions() -> usize {
    384
}
fn default_top_k() -> usize {
    1
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            source_path: default_source_path(),
            embedder: default_embedder(),
            embedding_model: default_embedding_model(),
            dimensions: default_dimensions(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_hash: Option<String>,

    /// Session name; the snapshot defaults to `<session>.json`
    #[serde(default = "default_session")]
    pub session: String,

    /// Account snapshot file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,

    /// Messages of history fetched per contact
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Also enumerate group members
    #[serde(default = "default_true")]
    pub include_groups: bool,

    /// Sender label for the account's own messages
    #[serde(default = "default_self_label")]
    pub self_label: String,
}

fn default_session() -> String {
    "my_account".into()
}
fn default_history_limit() -> usize {
    10
}
fn default_self_label() -> String {
    "Я".into()
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: None,
            session: default_session(),
            snapshot_path: None,
            history_limit: default_history_limit(),
            include_groups: true,
            self_label: default_self_label(),
        }
    }
}

impl AccountConfig {
    /// The snapshot file: explicit path, or `<session>.json` in the config dir.
    pub fn snapshot_file(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join(format!("{}.json", self.session)))
    }
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("api_id", &self.api_id)
            .field("api_hash", &redact(&self.api_hash))
            .field("session", &self.session)
            .field("snapshot_path", &self.snapshot_path)
            .field("history_limit", &self.history_limit)
            .field("include_groups", &self.include_groups)
            .field("self_label", &self.self_label)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Pause between contacts
    #[serde(default = "default_pacing_secs")]
    pub pacing_secs: u64,

    /// Deliver generated messages. Also requires `--send` on the command line.
    #[serde(default)]
    pub send_enabled: bool,
}

fn default_pacing_secs() -> u64 {
    5
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            pacing_secs: default_pacing_secs(),
            send_enabled: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.outreach/config.toml).
    ///
    /// Environment variables override the file:
    /// - `GIGACHAT_CREDENTIALS`: primary backend credentials
    /// - `HF_TOKEN`: secondary backend token
    /// - `TG_API_ID`, `TG_API_HASH`: account authorization
    /// - `OUTREACH_INDEX_DIR`: knowledge index directory
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("GIGACHAT_CREDENTIALS") {
            self.primary.credentials = Some(v);
        }
        if let Some(v) = non_empty("HF_TOKEN") {
            self.secondary.token = Some(v);
        }
        if let Some(v) = non_empty("TG_API_ID") {
            self.account.api_id = Some(v);
        }
        if let Some(v) = non_empty("TG_API_HASH") {
            self.account.api_hash = Some(v);
        }
        if let Some(v) = non_empty("OUTREACH_INDEX_DIR") {
            self.knowledge.index_dir = PathBuf::from(v);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".outreach")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, t) in [
            ("primary.temperature", self.primary.temperature),
            ("secondary.temperature", self.secondary.temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.secondary.max_new_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "secondary.max_new_tokens must be > 0".into(),
            ));
        }

        if self.account.history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "account.history_limit must be > 0".into(),
            ));
        }

        if self.knowledge.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.top_k must be >= 1".into(),
            ));
        }

        if self.knowledge.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.dimensions must be > 0".into(),
            ));
        }

        Ok(())
    }

    pub fn has_primary_credentials(&self) -> bool {
        has_value(&self.primary.credentials)
    }

    pub fn has_secondary_credentials(&self) -> bool {
        has_value(&self.secondary.token)
    }

    pub fn has_account_credentials(&self) -> bool {
        has_value(&self.account.api_id) && has_value(&self.account.api_hash)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn has_value(v: &Option<String>) -> bool {
    v.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.primary.scope, "GIGACHAT_API_PERS");
        assert_eq!(config.secondary.model, "facebook/bart-large-cnn");
        assert_eq!(config.secondary.max_new_tokens, 100);
        assert_eq!(config.account.history_limit, 10);
        assert_eq!(config.campaign.pacing_secs, 5);
        assert!(config.primary.verify_tls);
        assert!(!config.campaign.send_enabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.secondary.task, InferenceTask::Summarization);
        assert_eq!(parsed.knowledge.embedder, EmbedderKind::Hash);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.secondary.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_history_limit_rejected() {
        let mut config = AppConfig::default();
        config.account.history_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.primary.model, "GigaChat");
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[primary]
verify_tls = false

[secondary]
task = "text-generation"
model = "mistralai/Mistral-7B-Instruct-v0.3"

[campaign]
pacing_secs = 1
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert!(!config.primary.verify_tls);
        assert_eq!(config.secondary.task, InferenceTask::TextGeneration);
        assert_eq!(config.campaign.pacing_secs, 1);
        assert_eq!(config.knowledge.top_k, 1);
    }

    #[test]
    fn env_overrides_credentials() {
        let env: HashMap<&str, &str> = [
            ("GIGACHAT_CREDENTIALS", "Z2lnYQ=="),
            ("HF_TOKEN", "hf_abc"),
            ("TG_API_ID", "12345"),
            ("TG_API_HASH", "deadbeef"),
            ("OUTREACH_INDEX_DIR", "/var/lib/outreach/index"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        assert!(!config.has_primary_credentials());
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.has_primary_credentials());
        assert!(config.has_secondary_credentials());
        assert!(config.has_account_credentials());
        assert_eq!(
            config.knowledge.index_dir,
            PathBuf::from("/var/lib/outreach/index")
        );
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|k| (k == "HF_TOKEN").then(|| "  ".to_string()));
        assert!(!config.has_secondary_credentials());
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.primary.credentials = Some("super-secret".into());
        config.secondary.token = Some("hf_secret".into());
        config.account.api_hash = Some("hash-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("hf_secret"));
        assert!(!debug.contains("hash-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("GIGACHAT_API_PERS"));
        assert!(toml_str.contains("bart-large-cnn"));
    }
}
