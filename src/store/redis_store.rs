use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::redis_connector::KeyValueBackend;
use super::CredentialStore;
use crate::error::NetError;
use crate::models::SessionCookie;

/// A store backed by Redis, shared by every process that points at the same server.
///
/// Keys: `XToken:<app_id>` for the token and `PHPSESSIONID_<app_id>` for the
/// session cookie, which is stored as JSON. Both carry the same TTL.
pub struct RedisStore {
    token_key: String,
    session_key: String,
    session_cookie_name: String,
    backend: Arc<dyn KeyValueBackend>,
    ttl: Duration,
    /// Last cookie read or written. Held across the backend call on both paths.
    last_session: Mutex<Option<SessionCookie>>,
}

impl RedisStore {
    pub fn new(
        app_id: &str,
        session_cookie_name: &str,
        backend: Arc<dyn KeyValueBackend>,
        ttl: Duration,
    ) -> Self {
        RedisStore {
            token_key: format!("XToken:{}", app_id),
            session_key: format!("PHPSESSIONID_{}", app_id),
            session_cookie_name: session_cookie_name.to_string(),
            backend,
            ttl,
            last_session: Mutex::new(None),
        }
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), NetError> {
        self.backend
            .set_ex(key, value, self.ttl.as_secs().max(1))
            .await
    }
}

/// Decodes a stored cookie; anything that is not a cookie reads as absent.
fn decode_cookie(raw: &str) -> Option<SessionCookie> {
    match serde_json::from_str::<SessionCookie>(raw) {
        Ok(cookie) => Some(cookie),
        Err(e) => {
            debug!("Ignoring undecodable session cookie: {}", e);
            None
        }
    }
}

#[async_trait]
impl CredentialStore for RedisStore {
    async fn ensure_ready(&self) -> Result<(), NetError> {
        self.backend.ping().await
    }

    async fn get_token(&self) -> String {
        match self.backend.get(&self.token_key).await {
            Ok(token) => token.unwrap_or_default(),
            Err(e) => {
                warn!(key = %self.token_key, "Failed to read token from redis: {}", e);
                String::new()
            }
        }
    }

    async fn set_token(&self, token: &str) -> Result<(), NetError> {
        self.write(&self.token_key, token).await
    }

    async fn get_session_cookie(&self) -> Option<SessionCookie> {
        let mut last = self.last_session.lock().await;
        if last.is_some() {
            return last.clone();
        }

        let raw = match self.backend.get(&self.session_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %self.session_key, "Failed to read session cookie from redis: {}", e);
                return None;
            }
        };
        let cookie = decode_cookie(&raw)?;
        *last = Some(cookie.clone());
        Some(cookie)
    }

    async fn set_session_cookie(&self, cookies: &[SessionCookie]) -> Result<(), NetError> {
        let Some(cookie) = SessionCookie::find(cookies, &self.session_cookie_name) else {
            return Ok(());
        };
        let encoded = serde_json::to_string(cookie).map_err(|e| {
            NetError::Config(format!("session cookie is not serializable: {}", e))
        })?;

        let mut last = self.last_session.lock().await;
        let written = self.write(&self.session_key, &encoded).await;
        *last = written.as_ref().ok().map(|_| cookie.clone());
        written
    }

    fn backend(&self) -> &str {
        "redis"
    }
}
