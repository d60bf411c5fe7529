use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::NetError;

const DAY_IN_SECS: u64 = 24 * 60 * 60;

/// The store section of a client, as written in YAML.
///
/// - driver: `local` (default) or `redis`. Unknown values fall back to `local`.
/// - host/password/db: Redis connection parameters, `host` is `addr:port`.
/// - token/session TTLs apply to the local store, `ttl_in_secs` to Redis.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: i64,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_in_secs: u64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_in_secs: u64,
    #[serde(default = "default_token_ttl")]
    pub ttl_in_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            driver: None,
            host: None,
            password: None,
            db: 0,
            token_ttl_in_secs: default_token_ttl(),
            session_ttl_in_secs: default_session_ttl(),
            ttl_in_secs: default_token_ttl(),
        }
    }
}

fn default_token_ttl() -> u64 {
    DAY_IN_SECS
}

fn default_session_ttl() -> u64 {
    7 * DAY_IN_SECS
}

/// A resolved store selection. Built once per client and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Local(LocalStoreConfig),
    Redis(RedisStoreConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStoreConfig {
    pub token_ttl: Duration,
    pub session_ttl: Duration,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        LocalStoreConfig {
            token_ttl: Duration::from_secs(default_token_ttl()),
            session_ttl: Duration::from_secs(default_session_ttl()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedisStoreConfig {
    pub host: String,
    pub password: Option<String>,
    pub db: i64,
    pub ttl: Duration,
}

impl RedisStoreConfig {
    /// Identity of the underlying connection; stores with equal keys share one connector.
    pub fn connection_key(&self) -> (String, Option<String>, i64) {
        (self.host.clone(), self.password.clone(), self.db)
    }
}

impl StoreConfig {
    /// Resolves the driver selector into a backend.
    ///
    /// `redis` without a host is a configuration error; anything that is not
    /// `redis` resolves to the local store.
    pub fn backend(&self) -> Result<StoreBackend, NetError> {
        match self.driver.as_deref().map(str::trim) {
            Some(driver) if driver.eq_ignore_ascii_case("redis") => {
                let host = self
                    .host
                    .as_deref()
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| {
                        NetError::Config("redis driver needs store.host to be set".to_string())
                    })?;
                if self.ttl_in_secs == 0 {
                    return Err(NetError::Config(
                        "store.ttl_in_secs must be greater than zero".to_string(),
                    ));
                }
                Ok(StoreBackend::Redis(RedisStoreConfig {
                    host: host.to_string(),
                    password: self.password.clone().filter(|p| !p.is_empty()),
                    db: self.db,
                    ttl: Duration::from_secs(self.ttl_in_secs),
                }))
            }
            other => {
                if let Some(driver) = other.filter(|d| !d.eq_ignore_ascii_case("local")) {
                    warn!("Unknown store driver '{}', using the local store.", driver);
                }
                Ok(StoreBackend::Local(LocalStoreConfig {
                    token_ttl: Duration::from_secs(self.token_ttl_in_secs),
                    session_ttl: Duration::from_secs(self.session_ttl_in_secs),
                }))
            }
        }
    }
}
