use crate::db::GatewayOptions;
use crate::error::TallyError;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime settings for the `playtally` binary.
///
/// Defaults are overridden by `PLAYTALLY_*` environment variables, e.g.
/// `PLAYTALLY_DATABASE_PATH=/var/lib/bot/votes.sqlite`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub loglevel: String,
    pub enforce_foreign_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("playtally.sqlite"),
            loglevel: "info".to_string(),
            enforce_foreign_keys: false,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("PLAYTALLY_"))
    }

    pub fn load() -> Result<Self, TallyError> {
        Self::figment().extract().map_err(|e| TallyError::Config(Box::new(e)))
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            enforce_foreign_keys: self.enforce_foreign_keys,
        }
    }
}
