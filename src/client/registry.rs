use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use super::NetClient;
use crate::config::ClientConfig;
use crate::error::NetError;
use crate::store::RedisConnectors;

/// One client per application ID.
///
/// Clients whose stores point at the same Redis server share one connector.
pub struct ClientRegistry {
    clients: HashMap<String, Arc<NetClient>>,
}

impl ClientRegistry {
    /// Validates every config and builds the clients. Does no network IO.
    pub fn new(configs: &[ClientConfig]) -> Result<Self, NetError> {
        let mut connectors = RedisConnectors::default();
        let mut clients = HashMap::with_capacity(configs.len());
        for config in configs {
            if clients.contains_key(&config.app_id) {
                return Err(NetError::Config(format!(
                    "duplicate client for app_id '{}'",
                    config.app_id
                )));
            }
            let client = NetClient::with_connectors(config.clone(), &mut connectors)?;
            clients.insert(config.app_id.clone(), Arc::new(client));
        }
        info!(
            clients = clients.len(),
            redis_connectors = connectors.len(),
            "Built client registry."
        );
        Ok(ClientRegistry { clients })
    }

    /// Readiness check of every client's store, run concurrently.
    pub async fn connect(&self) -> Result<(), NetError> {
        try_join_all(self.clients.values().map(|client| client.connect())).await?;
        Ok(())
    }

    pub fn get(&self, app_id: &str) -> Option<Arc<NetClient>> {
        self.clients.get(app_id).cloned()
    }

    pub fn app_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
