//! Composition root.
//!
//! Builds the client registry from a loaded configuration and checks that
//! every credential store is reachable before any request is made.

use std::sync::Arc;

use tracing::info;

use crate::client::ClientRegistry;
use crate::config::ConfigV1;
use crate::error::NetError;

/// Builds and connects one client per configured application.
///
/// # Errors
///
/// Returns `NetError::Config` for invalid client entries and
/// `NetError::Connectivity` when a Redis store cannot be reached.
pub async fn init(config: &ConfigV1) -> Result<Arc<ClientRegistry>, NetError> {
    if config.clients.is_empty() {
        return Err(NetError::Config("no clients configured".to_string()));
    }
    let registry = ClientRegistry::new(&config.clients)?;
    registry.connect().await?;
    info!(clients = registry.len(), "Clients ready.");
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[tokio::test]
    async fn test_init_with_local_stores() {
        let config = parse_config(
            r#"
version: "1.0.0"
clients:
  - app_id: "a"
    app_secret: "s"
    login_url: "http://api.local/login"
    refresh_url: "http://api.local/refresh"
"#,
        )
        .unwrap();
        let registry = init(&config).await.unwrap();
        assert!(registry.get("a").is_some());
    }

    #[tokio::test]
    async fn test_init_without_clients_fails() {
        let config = parse_config("version: \"1.0.0\"\nclients: []\n").unwrap();
        assert!(matches!(init(&config).await, Err(NetError::Config(_))));
    }
}
