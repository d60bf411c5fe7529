use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cached::{Cached, TimedCache};
use tracing::debug;

use super::CredentialStore;
use crate::config::LocalStoreConfig;
use crate::error::NetError;
use crate::models::SessionCookie;

/// An in-process store. Nothing is shared with other processes or clients.
///
/// Token and session cookie live in separate timed caches so they expire
/// independently.
pub struct LocalStore {
    token_key: String,
    session_key: String,
    session_cookie_name: String,
    tokens: Mutex<TimedCache<String, String>>,
    sessions: Mutex<Sessions>,
}

/// The session cache and its read shortcut, always updated together.
struct Sessions {
    cache: TimedCache<String, SessionCookie>,
    /// Last cookie read back, served until the next overwrite.
    last: Option<SessionCookie>,
}

fn lifespan(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

impl LocalStore {
    pub fn new(app_id: &str, session_cookie_name: &str, config: &LocalStoreConfig) -> Self {
        LocalStore {
            token_key: format!("XToken:{}", app_id),
            session_key: format!("PHPSESSIONID_{}", app_id),
            session_cookie_name: session_cookie_name.to_string(),
            tokens: Mutex::new(TimedCache::with_lifespan(lifespan(config.token_ttl))),
            sessions: Mutex::new(Sessions {
                cache: TimedCache::with_lifespan(lifespan(config.session_ttl)),
                last: None,
            }),
        }
    }
}

#[async_trait]
impl CredentialStore for LocalStore {
    async fn ensure_ready(&self) -> Result<(), NetError> {
        Ok(())
    }

    async fn get_token(&self) -> String {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.cache_get(&self.token_key).cloned().unwrap_or_default()
    }

    async fn set_token(&self, token: &str) -> Result<(), NetError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.cache_set(self.token_key.clone(), token.to_string());
        Ok(())
    }

    async fn get_session_cookie(&self) -> Option<SessionCookie> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if sessions.last.is_some() {
            return sessions.last.clone();
        }
        let found = sessions.cache.cache_get(&self.session_key).cloned();
        sessions.last = found.clone();
        found
    }

    async fn set_session_cookie(&self, cookies: &[SessionCookie]) -> Result<(), NetError> {
        let Some(cookie) = SessionCookie::find(cookies, &self.session_cookie_name) else {
            return Ok(());
        };
        debug!(key = %self.session_key, "Storing session cookie.");
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.cache.cache_set(self.session_key.clone(), cookie.clone());
        sessions.last = None;
        Ok(())
    }

    fn backend(&self) -> &str {
        "local"
    }
}
