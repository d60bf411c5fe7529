use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::local_store::LocalStore;
use super::redis_connector::RedisConnectors;
use super::redis_store::RedisStore;
use crate::config::StoreBackend;
use crate::error::NetError;
use crate::models::SessionCookie;

/// Durable home of one application's bearer token and session cookie.
///
/// Every backend behaves identically from the client's point of view; each
/// instance is bound to a single application ID at construction.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Establishes the backend connection. Idempotent; a no-op for in-process stores.
    async fn ensure_ready(&self) -> Result<(), NetError>;

    /// The cached token, or an empty string when absent, expired or unreadable.
    async fn get_token(&self) -> String;

    /// Stores `token` with the backend TTL. An empty token invalidates.
    async fn set_token(&self, token: &str) -> Result<(), NetError>;

    /// The last session cookie seen for this application, if any.
    async fn get_session_cookie(&self) -> Option<SessionCookie>;

    /// Persists the session cookie found in `cookies`; other cookies are ignored.
    async fn set_session_cookie(&self, cookies: &[SessionCookie]) -> Result<(), NetError>;

    /// Backend name for logs.
    fn backend(&self) -> &str;
}

/// Creates the store selected by `backend` for one application.
///
/// Redis stores draw their connector from `connectors`, so stores pointing at
/// the same server share one connection.
pub fn create_store(
    app_id: &str,
    session_cookie_name: &str,
    backend: &StoreBackend,
    connectors: &mut RedisConnectors,
) -> Result<Arc<dyn CredentialStore>, NetError> {
    match backend {
        StoreBackend::Local(config) => {
            info!(app_id, "Using local credential store.");
            Ok(Arc::new(LocalStore::new(app_id, session_cookie_name, config)))
        }
        StoreBackend::Redis(config) => {
            let connector = connectors.get_or_create(config)?;
            info!(app_id, host = %config.host, "Using redis credential store.");
            Ok(Arc::new(RedisStore::new(
                app_id,
                session_cookie_name,
                connector,
                config.ttl,
            )))
        }
    }
}
