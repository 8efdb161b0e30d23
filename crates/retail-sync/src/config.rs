//! # Service Configuration
//!
//! Static configuration for the sync service: ERP connection, company,
//! storage locations and the schedule a fresh inventory document starts with.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FISHBOWL_SERVER_ADDRESS=10.0.0.12                                  │
//! │     USE_TEST_DB=true                                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/retail-sync/sync.toml (Linux)                            │
//! │     ~/Library/Application Support/com.retail.sync/sync.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runtime settings that change while the service runs (inventory method,
//! intervals, last run stamps) live in the inventory document, not here.
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [erp]
//! server_address = "10.0.0.12"
//! prod_port = 2456
//! test_port = 2457
//! use_test_db = false
//! username = "retail-sync"
//! password = "..."
//! login_attempts = 2
//! login_wait_secs = 20
//!
//! [company]
//! name = "Acme Outdoor"
//!
//! [storage]
//! data_file = "/var/lib/retail-sync/inventory.json"
//! error_log_file = "/var/lib/retail-sync/error_log.json"
//!
//! [schedule]
//! sync_interval_minutes = 5
//! sales_interval_minutes = 180
//! inventory_method = "manual"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use retail_core::{InventoryMethod, SyncConfig, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};
use retail_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// ERP Settings
// =============================================================================

/// Fishbowl connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpSettings {
    #[serde(default = "default_server_address")]
    pub server_address: String,

    #[serde(default = "default_prod_port")]
    pub prod_port: u16,

    #[serde(default = "default_test_port")]
    pub test_port: u16,

    /// Connect to the test database instance instead of production.
    #[serde(default)]
    pub use_test_db: bool,

    /// Integration identity shown in Fishbowl's integrated apps list.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_app_description")]
    pub app_description: String,

    #[serde(default = "default_app_id")]
    pub app_id: u64,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Optional bearer token sent with the login request.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Login attempts per session before giving up.
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,

    /// Wait before the first login retry (seconds).
    #[serde(default = "default_login_wait")]
    pub login_wait_secs: u64,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Fishbowl user IDs that create storefront sales orders.
    #[serde(default = "default_order_user_ids")]
    pub order_user_ids: Vec<i64>,

    /// Replacement SQL for the quantity-on-hand query.
    #[serde(default)]
    pub qoh_query_file: Option<PathBuf>,

    /// Replacement SQL for the cycle-out query.
    #[serde(default)]
    pub cycle_out_query_file: Option<PathBuf>,
}

fn default_server_address() -> String {
    "localhost".to_string()
}

fn default_prod_port() -> u16 {
    2456
}

fn default_test_port() -> u16 {
    2457
}

fn default_app_name() -> String {
    "Retail Inventory Manager".to_string()
}

fn default_app_description() -> String {
    "Keeps the retail website inventory location in sync".to_string()
}

fn default_app_id() -> u64 {
    4620
}

fn default_login_attempts() -> u32 {
    2
}

fn default_login_wait() -> u64 {
    20
}

fn default_request_timeout() -> u64 {
    60
}

fn default_order_user_ids() -> Vec<i64> {
    vec![95, 25]
}

impl Default for ErpSettings {
    fn default() -> Self {
        ErpSettings {
            server_address: default_server_address(),
            prod_port: default_prod_port(),
            test_port: default_test_port(),
            use_test_db: false,
            app_name: default_app_name(),
            app_description: default_app_description(),
            app_id: default_app_id(),
            username: String::new(),
            password: String::new(),
            bearer_token: None,
            login_attempts: default_login_attempts(),
            login_wait_secs: default_login_wait(),
            request_timeout_secs: default_request_timeout(),
            order_user_ids: default_order_user_ids(),
            qoh_query_file: None,
            cycle_out_query_file: None,
        }
    }
}

impl ErpSettings {
    /// Port for the selected database instance.
    pub fn port(&self) -> u16 {
        if self.use_test_db {
            self.test_port
        } else {
            self.prod_port
        }
    }

    /// `http://<server>:<port>` for the selected instance.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server_address, self.port())
    }

    pub fn login_wait(&self) -> Duration {
        Duration::from_secs(self.login_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Company Settings
// =============================================================================

/// The company whose retail location is synced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySettings {
    /// Location group name; prefixes the retail location in imports.
    #[serde(default = "default_company_name")]
    pub name: String,
}

fn default_company_name() -> String {
    "Company".to_string()
}

impl Default for CompanySettings {
    fn default() -> Self {
        CompanySettings {
            name: default_company_name(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the inventory document and error log live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    #[serde(default = "default_error_log_file")]
    pub error_log_file: PathBuf,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "retail", "sync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_file() -> PathBuf {
    data_dir().join("inventory.json")
}

fn default_error_log_file() -> PathBuf {
    data_dir().join("error_log.json")
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff() -> u64 {
    100
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_file: default_data_file(),
            error_log_file: default_error_log_file(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

// =============================================================================
// Schedule Settings
// =============================================================================

/// Runtime config a freshly created inventory document starts with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u32,

    #[serde(default = "default_sales_interval")]
    pub sales_interval_minutes: u32,

    #[serde(default)]
    pub inventory_method: InventoryMethod,
}

fn default_sync_interval() -> u32 {
    5
}

fn default_sales_interval() -> u32 {
    180
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            sync_interval_minutes: default_sync_interval(),
            sales_interval_minutes: default_sales_interval(),
            inventory_method: InventoryMethod::default(),
        }
    }
}

// =============================================================================
// Main Service Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub erp: ErpSettings,

    #[serde(default)]
    pub company: CompanySettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub schedule: ScheduleSettings,
}

impl ServiceConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading service config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults (with env overrides) if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load service config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Service config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.erp.server_address.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "erp.server_address must not be empty".into(),
            ));
        }

        if self.erp.port() == 0 {
            return Err(SyncError::InvalidConfig("erp port must be greater than 0".into()));
        }

        url::Url::parse(&self.erp.base_url())?;

        if self.erp.username.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "erp.username is required (set FISHBOWL_USERNAME)".into(),
            ));
        }

        if self.erp.login_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "erp.login_attempts must be at least 1".into(),
            ));
        }

        if self.company.name.trim().is_empty() {
            return Err(SyncError::InvalidConfig("company.name must not be empty".into()));
        }

        for (field, minutes) in [
            ("schedule.sync_interval_minutes", self.schedule.sync_interval_minutes),
            ("schedule.sales_interval_minutes", self.schedule.sales_interval_minutes),
        ] {
            if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&minutes) {
                return Err(SyncError::InvalidConfig(format!(
                    "{} must be between {} and {}",
                    field, MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(address) = std::env::var("FISHBOWL_SERVER_ADDRESS") {
            debug!(address = %address, "Overriding ERP address from environment");
            self.erp.server_address = address;
        }

        if let Ok(port) = std::env::var("FISHBOWL_PROD_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.erp.prod_port = p,
                Err(_) => warn!(port = %port, "Invalid FISHBOWL_PROD_PORT in environment"),
            }
        }

        if let Ok(port) = std::env::var("FISHBOWL_TEST_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.erp.test_port = p,
                Err(_) => warn!(port = %port, "Invalid FISHBOWL_TEST_PORT in environment"),
            }
        }

        if let Ok(flag) = std::env::var("USE_TEST_DB") {
            self.erp.use_test_db = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
            debug!(use_test_db = self.erp.use_test_db, "Overriding database instance from environment");
        }

        if let Ok(name) = std::env::var("FISHBOWL_APP_NAME") {
            self.erp.app_name = name;
        }

        if let Ok(description) = std::env::var("FISHBOWL_APP_DESCRIPTION") {
            self.erp.app_description = description;
        }

        if let Ok(id) = std::env::var("FISHBOWL_APP_ID") {
            match id.parse::<u64>() {
                Ok(id) => self.erp.app_id = id,
                Err(_) => warn!(app_id = %id, "Invalid FISHBOWL_APP_ID in environment"),
            }
        }

        if let Ok(username) = std::env::var("FISHBOWL_USERNAME") {
            self.erp.username = username;
        }

        if let Ok(password) = std::env::var("FISHBOWL_PASSWORD") {
            self.erp.password = password;
        }

        if let Ok(token) = std::env::var("FISHBOWL_BEARER_TOKEN") {
            self.erp.bearer_token = Some(token).filter(|t| !t.is_empty());
        }

        if let Ok(name) = std::env::var("COMPANY_NAME") {
            self.company.name = name;
        }

        if let Ok(minutes) = std::env::var("SYNC_INTERVAL_MINUTES") {
            match minutes.parse::<u32>() {
                Ok(m) => self.schedule.sync_interval_minutes = m,
                Err(_) => warn!(value = %minutes, "Invalid SYNC_INTERVAL_MINUTES in environment"),
            }
        }

        if let Ok(minutes) = std::env::var("SALES_INTERVAL_MINUTES") {
            match minutes.parse::<u32>() {
                Ok(m) => self.schedule.sales_interval_minutes = m,
                Err(_) => warn!(value = %minutes, "Invalid SALES_INTERVAL_MINUTES in environment"),
            }
        }

        if let Ok(path) = std::env::var("DATA_FILE") {
            self.storage.data_file = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("ERROR_LOG_FILE") {
            self.storage.error_log_file = PathBuf::from(path);
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "retail", "sync")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Runtime config seeded into a new inventory document.
    pub fn initial_sync_config(&self) -> SyncConfig {
        SyncConfig {
            inventory_method: self.schedule.inventory_method,
            sync_interval_minutes: self.schedule.sync_interval_minutes,
            sales_interval_minutes: self.schedule.sales_interval_minutes,
            ..SyncConfig::default()
        }
    }

    /// Store configuration derived from `[storage]` and `[schedule]`.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.storage.data_file, &self.storage.error_log_file)
            .max_retries(self.storage.max_retries)
            .retry_backoff(Duration::from_millis(self.storage.retry_backoff_ms))
            .initial_config(self.initial_sync_config())
    }
}
