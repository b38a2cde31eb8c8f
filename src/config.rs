use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_GATEWAY_BACKEND: &str = "in-memory";
const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_DRIVE_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DEFAULT_SPREADSHEET_TITLE: &str = "Larder Database";
const DEFAULT_INVENTORY_SHEET: &str = "Inventory";
const DEFAULT_HISTORY_SHEET: &str = "History";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const BACKEND_IN_MEMORY: &str = "in-memory";
pub const BACKEND_SHEETS: &str = "sheets";

/// Spreadsheet gateway configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SheetsConfig {
    /// Base URL of the spreadsheet values API
    #[serde(default = "default_api_base_url")]
    #[validate(url)]
    pub api_base_url: String,

    /// Base URL of the file search API used to find the spreadsheet
    #[serde(default = "default_drive_api_base_url")]
    #[validate(url)]
    pub drive_api_base_url: String,

    /// Spreadsheet holding the inventory and history sheets. When unset, the
    /// spreadsheet titled `spreadsheet_title` is found or created.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    #[serde(default = "default_spreadsheet_title")]
    #[validate(length(min = 1))]
    pub spreadsheet_title: String,

    #[serde(default = "default_inventory_sheet")]
    #[validate(length(min = 1))]
    pub inventory_sheet: String,

    #[serde(default = "default_history_sheet")]
    #[validate(length(min = 1))]
    pub history_sheet: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            drive_api_base_url: default_drive_api_base_url(),
            spreadsheet_id: None,
            spreadsheet_title: default_spreadsheet_title(),
            inventory_sheet: default_inventory_sheet(),
            history_sheet: default_history_sheet(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Item store backend: "in-memory" or "sheets"
    #[serde(default = "default_gateway_backend")]
    #[validate(custom = "validate_gateway_backend")]
    pub gateway_backend: String,

    #[serde(default)]
    #[validate]
    pub sheets: SheetsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            gateway_backend: default_gateway_backend(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn uses_sheets(&self) -> bool {
        self.gateway_backend.eq_ignore_ascii_case(BACKEND_SHEETS)
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let blank_spreadsheet_id = self
            .sheets
            .spreadsheet_id
            .as_deref()
            .map(|id| id.trim().is_empty())
            .unwrap_or(false);
        if blank_spreadsheet_id {
            let mut err = ValidationError::new("spreadsheet_id_blank");
            err.message = Some(
                "Leave APP__SHEETS__SPREADSHEET_ID unset to search by title instead of setting it empty"
                    .into(),
            );
            errors.add("sheets", err);
        }

        if self.is_production() && !self.uses_sheets() {
            let mut err = ValidationError::new("in_memory_backend_in_production");
            err.message = Some(
                "The in-memory backend keeps nothing across restarts and must not be used in production"
                    .into(),
            );
            errors.add("gateway_backend", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_gateway_backend() -> String {
    DEFAULT_GATEWAY_BACKEND.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_SHEETS_API_BASE_URL.to_string()
}

fn default_drive_api_base_url() -> String {
    DEFAULT_DRIVE_API_BASE_URL.to_string()
}

fn default_spreadsheet_title() -> String {
    DEFAULT_SPREADSHEET_TITLE.to_string()
}

fn default_inventory_sheet() -> String {
    DEFAULT_INVENTORY_SHEET.to_string()
}

fn default_history_sheet() -> String {
    DEFAULT_HISTORY_SHEET.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
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

fn validate_gateway_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        BACKEND_IN_MEMORY | BACKEND_SHEETS => Ok(()),
        _ => {
            let mut err = ValidationError::new("gateway_backend");
            err.message = Some("Must be one of: in-memory, sheets".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("larder={}", level));

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration from the `config/` directory.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (`{dir}/default.toml`)
/// 3. Environment-specific config (`{dir}/{env}.toml`)
/// 4. Environment variables (`APP__*`)
pub fn load_config_from(dir: impl AsRef<Path>) -> Result<AppConfig, AppConfigError> {
    let dir = dir.as_ref();
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("gateway_backend", DEFAULT_GATEWAY_BACKEND)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(backend = %app_config.gateway_backend, "Configuration loaded successfully");
    Ok(app_config)
}
