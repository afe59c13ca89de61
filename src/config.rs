use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::env as std_env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_STORAGE_DIR: &str = ".requisition-tracker";
const DEFAULT_CURRENCY: &str = "ZAR";
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024; // 10MB
const CONFIG_DIR: &str = "config";

/// Role → permitted identities table. Each list holds email addresses.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApproverTable {
    pub finance: Vec<String>,
    pub coo: Vec<String>,
    pub cfo: Vec<String>,
    pub ceo: Vec<String>,
    pub admin: Vec<String>,
}

impl Default for ApproverTable {
    fn default() -> Self {
        Self {
            finance: vec!["finance@example.com".to_string()],
            coo: vec!["coo@example.com".to_string()],
            cfo: vec!["cfo@example.com".to_string()],
            ceo: vec!["ceo@example.com".to_string()],
            admin: vec!["admin@example.com".to_string()],
        }
    }
}

/// A static login entry. `password_hash` is an Argon2 PHC string.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct UserCredential {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub password_hash: String,
}

/// Lets any address in `domain` sign in with one shared password.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct OpenDomainLogin {
    #[validate(length(min = 1))]
    pub domain: String,
    #[validate(length(min = 1))]
    pub shared_password_hash: String,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Directory holding the persisted requisition and session records
    pub storage_dir: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Currency code used when rendering amounts
    #[serde(default = "default_currency")]
    #[validate(length(min = 1, max = 8))]
    pub currency: String,

    /// Largest attachment accepted, in bytes
    #[serde(default = "default_max_attachment_bytes")]
    #[validate(range(min = 1))]
    pub max_attachment_bytes: u64,

    /// Approver directory
    #[serde(default)]
    pub approvers: ApproverTable,

    /// Static credential list
    #[serde(default)]
    pub users: Vec<UserCredential>,

    /// Optional domain-wide login
    #[serde(default)]
    pub open_domain: Option<OpenDomainLogin>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: DEFAULT_STORAGE_DIR.to_string(),
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            currency: default_currency(),
            max_attachment_bytes: default_max_attachment_bytes(),
            approvers: ApproverTable::default(),
            users: Vec::new(),
            open_domain: None,
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_dir)
    }

    /// Validates the nested credential entries.
    pub fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        for user in &self.users {
            user.validate()?;
        }
        if let Some(open) = &self.open_domain {
            open.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_max_attachment_bytes() -> u64 {
    DEFAULT_MAX_ATTACHMENT_BYTES
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("requisition_tracker={},requisition_cli={}", level, level);
    let filter_directive = std_env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(filter_directive)
            .with_writer(std::io::stderr)
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter_directive)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Loads application configuration from the default `config` directory.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. `{config_dir}/default.toml`
/// 3. `{config_dir}/{run_env}.toml`
/// 4. Environment variables (APP__*)
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("storage_dir", DEFAULT_STORAGE_DIR)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("currency", DEFAULT_CURRENCY)?
        .set_default("max_attachment_bytes", DEFAULT_MAX_ATTACHMENT_BYTES as i64)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Credential configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
