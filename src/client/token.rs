use reqwest::Method;
use tracing::{debug, info, warn};

use super::client::decode_envelope;
use super::request::RequestBody;
use super::NetClient;
use crate::error::NetError;
use crate::models::{Endpoint, TokenData};

const CACHE_HIT_EVENT: &str = "client.token.cache.hit";

/// Extracts the token from a login or refresh response.
fn token_from_body(url: &str, body: &[u8]) -> Result<String, NetError> {
    let envelope = decode_envelope(url, body)?;
    if !envelope.is_success() {
        return Err(NetError::Application {
            url: url.to_string(),
            code: envelope.code.into(),
            message: envelope.message,
        });
    }
    let data: TokenData =
        serde_json::from_value(envelope.data).map_err(|source| NetError::Decode {
            url: url.to_string(),
            source,
            body: String::from_utf8_lossy(body).into_owned(),
        })?;
    Ok(data.access_token)
}

impl NetClient {
    /// Returns the cached token, logging in when there is none.
    ///
    /// A cache hit never touches the network.
    pub async fn get_token(&self) -> Result<String, NetError> {
        let cached = self.store.get_token().await;
        if !cached.is_empty() {
            if let Some(suppressed_count) = self.log_throttle.should_emit(CACHE_HIT_EVENT) {
                debug!(
                    event_name = CACHE_HIT_EVENT,
                    app_id = %self.config.app_id,
                    store = self.store.backend(),
                    cache_result = "hit",
                    suppressed_count,
                    "Token served from cache."
                );
            }
            return Ok(cached);
        }

        let endpoint = Endpoint::public(self.config.login_url.clone());
        let body = self
            .do_request(
                Method::POST,
                &endpoint,
                RequestBody::Form(self.config.login_body()),
            )
            .await?;
        let token = token_from_body(&endpoint.url, &body)?;
        self.persist_token(&token).await;
        info!(app_id = %self.config.app_id, "Acquired a new token.");
        Ok(token)
    }

    /// Exchanges the current token for a fresh one at the refresh endpoint.
    pub async fn refresh_token(&self) -> Result<String, NetError> {
        let endpoint = Endpoint::authenticated(self.config.refresh_url.clone());
        let body = self
            .do_request(Method::GET, &endpoint, RequestBody::Empty)
            .await?;
        let token = token_from_body(&endpoint.url, &body)?;
        self.persist_token(&token).await;
        info!(app_id = %self.config.app_id, "Refreshed token.");
        Ok(token)
    }

    async fn persist_token(&self, token: &str) {
        if let Err(e) = self.store.set_token(token).await {
            warn!(app_id = %self.config.app_id, "Failed to store token: {}", e);
        }
    }
}
