use crate::info;
use crate::logger::{self, LogLevel};
use config::{Config, ConfigError, Environment, File};
use dotenv::dotenv;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Once;

static DOTENV_ONCE: Once = Once::new();

const ENV_PREFIX: &str = "ROHM";

fn load_dotenv() {
    DOTENV_ONCE.call_once(|| {
        if dotenv().is_ok() {
            info!("Loaded .env file");
        }
    });
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RohmConfig {
    /// Database file; an in-memory database is used when unset.
    pub db_path: Option<PathBuf>,
    pub cache_size_mb: usize,
    pub log_level: String,
}

impl Default for RohmConfig {
    fn default() -> Self {
        RohmConfig { db_path: None, cache_size_mb: 64, log_level: "info".to_string() }
    }
}

impl RohmConfig {
    /// Defaults, overlaid by the file at `path` (format detected by extension) and
    /// then by `ROHM__*` environment variables, a `.env` file included.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        load_dotenv();
        let defaults = RohmConfig::default();
        let cfg = Config::builder()
            .set_default("cache_size_mb", defaults.cache_size_mb as u64)?
            .set_default("log_level", defaults.log_level)?
            .add_source(File::with_name(path).required(true))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true).separator("__"))
            .build()?
            .try_deserialize::<RohmConfig>()?;
        info!("{:#?}", cfg);
        Ok(cfg)
    }

    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.log_level.parse::<LogLevel>().map_err(ConfigError::Message)
    }

    pub fn apply_log_level(&self) -> Result<(), ConfigError> {
        logger::set_level(self.log_level()?);
        Ok(())
    }
}
