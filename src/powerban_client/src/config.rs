use crate::error::{ConfigError, StorageError};
use crate::storage::{SettingsMemory, StableStore};
use std::path::PathBuf;
use std::time::Duration;

pub const BASE_API_URL_ENV: &str = "POWERBAN_BASE_API_URL";
pub const TICK_INTERVAL_ENV: &str = "POWERBAN_TICK_INTERVAL_MS";
pub const RESYNC_DELAY_ENV: &str = "POWERBAN_RESYNC_DELAY_MS";
pub const STORAGE_PATH_ENV: &str = "POWERBAN_STORAGE_PATH";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConf {
    pub base_api_url: String,
    pub tick_interval_ms: u64,
    pub resync_delay_ms: u64,
    /// Price of one ticket in BAN.
    pub ticket_price: u64,
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConf {
    fn default() -> Self {
        ClientConf {
            base_api_url: String::new(),
            tick_interval_ms: 1_000,
            resync_delay_ms: 5_000,
            ticket_price: 10,
            storage_path: None,
        }
    }
}

/// Partial overrides applied on top of a configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitArgs {
    pub base_api_url: Option<String>,
    pub tick_interval_ms: Option<u64>,
    pub resync_delay_ms: Option<u64>,
    pub ticket_price: Option<u64>,
    pub storage_path: Option<PathBuf>,
}

impl ClientConf {
    pub fn init(&mut self, args: InitArgs) {
        if let Some(url) = args.base_api_url {
            self.base_api_url = url;
        }
        if let Some(ms) = args.tick_interval_ms {
            self.tick_interval_ms = ms;
        }
        if let Some(ms) = args.resync_delay_ms {
            self.resync_delay_ms = ms;
        }
        if let Some(price) = args.ticket_price {
            self.ticket_price = price;
        }
        if args.storage_path.is_some() {
            self.storage_path = args.storage_path;
        }
    }

    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let conf: ClientConf = serde_json::from_str(document)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Defaults overlaid with whatever `POWERBAN_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut conf = ClientConf::default();
        conf.init(InitArgs::from_vars(|var| std::env::var(var).ok())?);
        conf.validate()?;
        Ok(conf)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                reason: "must be greater than zero",
            });
        }
        if self.resync_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "resync_delay_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn resync_delay(&self) -> Duration {
        Duration::from_millis(self.resync_delay_ms)
    }

    /// Settings store at `storage_path`, or an in-memory one when unset.
    pub fn open_store(&self) -> Result<StableStore<SettingsMemory>, StorageError> {
        StableStore::configured(self.storage_path.as_deref())
    }
}

impl InitArgs {
    fn from_vars(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let millis = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(var)
                .map(|value| value.trim().parse().map_err(|_| ConfigError::Env { var, value }))
                .transpose()
        };

        Ok(InitArgs {
            base_api_url: lookup(BASE_API_URL_ENV),
            tick_interval_ms: millis(TICK_INTERVAL_ENV)?,
            resync_delay_ms: millis(RESYNC_DELAY_ENV)?,
            ticket_price: None,
            storage_path: lookup(STORAGE_PATH_ENV).map(PathBuf::from),
        })
    }
}
