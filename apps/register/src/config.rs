//! # Register Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CARDPOS_*`)
//! 2. Config file (`register.toml`, or the path given with `--config`)
//! 3. Defaults (this file)
//!
//! ## File Format
//! ```toml
//! [database]
//! path = "/var/lib/cardpos/cardpos.db"
//! max_connections = 5
//!
//! [store]
//! name = "Pallet Town Cards"
//! currency_symbol = "S/ "
//!
//! [discounts]
//! seller_ceiling = "20"
//! ```
//!
//! Every section and key is optional. Configuration is read-only after
//! startup.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use cardpos_core::{DiscountPolicy, Money, Percentage};

pub const ENV_DB_PATH: &str = "CARDPOS_DB_PATH";
pub const ENV_STORE_NAME: &str = "CARDPOS_STORE_NAME";
pub const ENV_CURRENCY_SYMBOL: &str = "CARDPOS_CURRENCY_SYMBOL";
pub const ENV_SELLER_DISCOUNT_CEILING: &str = "CARDPOS_SELLER_DISCOUNT_CEILING";

const CONFIG_FILE_NAME: &str = "register.toml";
const DB_FILE_NAME: &str = "cardpos.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("could not determine the application data directory")]
    NoDataDirectory,
}

// =============================================================================
// Sections
// =============================================================================

/// Register configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterConfig {
    pub database: DatabaseSection,
    pub store: StoreSection,
    pub discounts: DiscountSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,

    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Printed at the top of receipts
    pub name: String,

    /// Prefix for amounts, e.g. "S/ " or "$"
    pub currency_symbol: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: "CardPOS Dev Store".to_string(),
            currency_symbol: "S/ ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountSection {
    /// Largest manual discount a seller may give, as a percentage ("20", "12.5").
    pub seller_ceiling: String,
}

impl Default for DiscountSection {
    fn default() -> Self {
        DiscountSection {
            seller_ceiling: "20".to_string(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl RegisterConfig {
    /// Loads the configuration.
    ///
    /// ## Behavior
    /// - `explicit` path given: the file must exist and parse.
    /// - Otherwise `register.toml` in the platform config directory is used
    ///   if present, defaults if not.
    /// - Environment variables are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => RegisterConfig::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.discount_policy()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Reading config file");

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `CARDPOS_*` overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = set(ENV_DB_PATH) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(name) = set(ENV_STORE_NAME) {
            self.store.name = name;
        }
        if let Some(symbol) = lookup(ENV_CURRENCY_SYMBOL) {
            self.store.currency_symbol = symbol;
        }
        if let Some(ceiling) = set(ENV_SELLER_DISCOUNT_CEILING) {
            self.discounts.seller_ceiling = ceiling;
        }
    }

    /// The manual-discount policy with the configured seller ceiling.
    pub fn discount_policy(&self) -> Result<DiscountPolicy, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            key: "discounts.seller_ceiling".to_string(),
            reason,
        };

        let ceiling: Percentage = self
            .discounts
            .seller_ceiling
            .parse()
            .map_err(|e: cardpos_core::money::ParseAmountError| invalid(e.to_string()))?;

        if !ceiling.is_valid() {
            return Err(invalid(format!("{} is above 100%", ceiling)));
        }

        Ok(DiscountPolicy::new(ceiling))
    }

    /// Database file to open. Creates the parent directory when needed.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        let path = match &self.database.path {
            Some(path) => path.clone(),
            None => ProjectDirs::from("com", "cardpos", "register")
                .ok_or(ConfigError::NoDataDirectory)?
                .data_dir()
                .join(DB_FILE_NAME),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(path)
    }

    /// Formats an amount with the store's currency symbol.
    ///
    /// ```rust,ignore
    /// let config = RegisterConfig::default();
    /// assert_eq!(config.format_money(Money::from_cents(1234)), "S/ 12.34");
    /// ```
    pub fn format_money(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        format!("{}{}{}", sign, self.store.currency_symbol, amount.abs())
    }
}

/// `register.toml` in the platform config directory.
fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "cardpos", "register")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
