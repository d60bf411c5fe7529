use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{
    AsyncCommands, AsyncConnectionConfig, Client, ConnectionAddr, ConnectionInfo,
    RedisConnectionInfo, RedisError, RedisResult,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RedisStoreConfig;
use crate::error::NetError;

const DEFAULT_REDIS_PORT: u16 = 6379;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// The three verbs the Redis store needs.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Connects if needed and checks the server answers.
    async fn ping(&self) -> Result<(), NetError>;

    async fn get(&self, key: &str) -> Result<Option<String>, NetError>;

    /// SETEX: stores `value` under `key` for `ttl_secs` seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), NetError>;
}

/// A lazily established, multiplexed connection to a Redis server.
///
/// Construction does no IO. The first command dials and pings the server.
/// A connection that fails with an IO error is dropped and the next command
/// dials again.
pub struct RedisConnector {
    host: String,
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

fn parse_host(host: &str) -> Result<(String, u16), NetError> {
    match host.rsplit_once(':') {
        Some((addr, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                NetError::Config(format!("invalid redis port in store.host '{}'", host))
            })?;
            Ok((addr.to_string(), port))
        }
        None => Ok((host.to_string(), DEFAULT_REDIS_PORT)),
    }
}

/// Errors after which the connection cannot be trusted anymore.
fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_timeout()
}

impl RedisConnector {
    pub fn new(config: &RedisStoreConfig) -> Result<Self, NetError> {
        let (addr, port) = parse_host(&config.host)?;
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(addr, port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = Client::open(info)?;
        Ok(RedisConnector {
            host: config.host.clone(),
            client,
            connection: Mutex::new(None),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the shared connection, dialing and pinging the server when there is none.
    pub async fn connect(&self) -> Result<MultiplexedConnection, NetError> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        debug!(host = %self.host, "Connecting to redis.");
        let config = AsyncConnectionConfig::new()
            .set_connection_timeout(CONNECT_TIMEOUT)
            .set_response_timeout(RESPONSE_TIMEOUT);
        let mut conn = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(|e| {
                NetError::Connectivity(format!("redis at {} unreachable: {}", self.host, e))
            })?;
        let pong = redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                NetError::Connectivity(format!("redis at {} failed PING: {}", self.host, e))
            })?;
        info!(host = %self.host, reply = %pong, "Connected to redis.");

        *slot = Some(conn.clone());
        Ok(conn)
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Passes `result` through, forgetting the connection when it broke.
    async fn checked<T>(&self, result: RedisResult<T>) -> Result<T, NetError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_error(&e) {
                    warn!(host = %self.host, "Dropping broken redis connection: {}", e);
                    *self.connection.lock().await = None;
                }
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl KeyValueBackend for RedisConnector {
    async fn ping(&self) -> Result<(), NetError> {
        self.connect().await.map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, NetError> {
        let mut conn = self.connect().await?;
        let result: RedisResult<Option<String>> = conn.get(key).await;
        self.checked(result).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), NetError> {
        let mut conn = self.connect().await?;
        let result: RedisResult<()> = conn.set_ex(key, value, ttl_secs).await;
        self.checked(result).await
    }
}

/// Connectors keyed by server identity, so clients on the same server share one.
#[derive(Default)]
pub struct RedisConnectors {
    connectors: HashMap<(String, Option<String>, i64), Arc<RedisConnector>>,
}

impl RedisConnectors {
    pub fn get_or_create(
        &mut self,
        config: &RedisStoreConfig,
    ) -> Result<Arc<RedisConnector>, NetError> {
        let key = config.connection_key();
        if let Some(connector) = self.connectors.get(&key) {
            return Ok(connector.clone());
        }
        let connector = Arc::new(RedisConnector::new(config)?);
        self.connectors.insert(key, connector.clone());
        Ok(connector)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
