use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;
use tracing::{info, warn};

use super::request::{transport_error, RequestBody};
use crate::config::ClientConfig;
use crate::error::NetError;
use crate::models::{Endpoint, Envelope, Reply, ResponseStatus};
use crate::store::{create_store, CredentialStore, RedisConnectors};
use crate::utils::log_throttle::LogThrottle;

const CACHE_HIT_LOG_WINDOW: Duration = Duration::from_secs(30);
const UPLOAD_MIME: &str = "application/octet-stream";

/// A token-aware client for one application.
///
/// Holds the immutable config, an HTTP transport and the credential store.
/// Cheap to share behind an `Arc`; every call is independent.
pub struct NetClient {
    pub(super) config: Arc<ClientConfig>,
    pub(super) http: reqwest::Client,
    pub(super) store: Arc<dyn CredentialStore>,
    pub(super) default_headers: HeaderMap,
    pub(super) token_header: HeaderName,
    pub(super) log_throttle: LogThrottle,
}

fn parse_headers(config: &ClientConfig) -> Result<HeaderMap, NetError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| NetError::Config(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| NetError::Config(format!("invalid value for header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Decodes a body into the response envelope. Empty bodies never reach the decoder.
pub(crate) fn decode_envelope(url: &str, body: &[u8]) -> Result<Envelope<Value>, NetError> {
    if body.is_empty() {
        return Err(NetError::EmptyResponse {
            url: url.to_string(),
        });
    }
    serde_json::from_slice(body).map_err(|source| NetError::Decode {
        url: url.to_string(),
        source,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

impl NetClient {
    /// Builds a client and its store from config. Does no network IO.
    pub fn new(config: ClientConfig) -> Result<Self, NetError> {
        let mut connectors = RedisConnectors::default();
        Self::with_connectors(config, &mut connectors)
    }

    /// Like `new`, but Redis stores reuse connectors from `connectors`.
    pub fn with_connectors(
        config: ClientConfig,
        connectors: &mut RedisConnectors,
    ) -> Result<Self, NetError> {
        config.validate()?;
        let backend = config.store.backend()?;
        let store = create_store(
            &config.app_id,
            &config.session_cookie_name,
            &backend,
            connectors,
        )?;
        Self::with_store(config, store)
    }

    /// Builds a client around an existing store.
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, NetError> {
        config.validate()?;
        let default_headers = parse_headers(&config)?;
        let token_header = HeaderName::from_bytes(config.token_header.as_bytes()).map_err(|e| {
            NetError::Config(format!(
                "invalid token_header '{}': {}",
                config.token_header, e
            ))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| NetError::Config(format!("failed to build HTTP client: {}", e)))?;

        info!(
            app_id = %config.app_id,
            store = store.backend(),
            deadline_ms = config.deadline_in_ms,
            timeout_ms = config.timeout_in_ms,
            "Created client."
        );

        Ok(NetClient {
            config: Arc::new(config),
            http,
            store,
            default_headers,
            token_header,
            log_throttle: LogThrottle::new(CACHE_HIT_LOG_WINDOW),
        })
    }

    /// Makes sure the credential store is reachable.
    pub async fn connect(&self) -> Result<(), NetError> {
        self.store.ensure_ready().await
    }

    pub fn app_id(&self) -> &str {
        &self.config.app_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// GET an endpoint and decode its envelope.
    pub async fn get(&self, endpoint: &Endpoint) -> Result<Reply, NetError> {
        let body = self
            .do_request(Method::GET, endpoint, RequestBody::Empty)
            .await?;
        self.dispatch(&endpoint.url, body).await
    }

    /// POST a form-encoded body and decode the envelope.
    pub async fn post(&self, endpoint: &Endpoint, form: impl Into<String>) -> Result<Reply, NetError> {
        let body = self
            .do_request(Method::POST, endpoint, RequestBody::Form(form.into()))
            .await?;
        self.dispatch(&endpoint.url, body).await
    }

    /// POST a multipart form: one file part named `field_name`, then `extra_fields` as text parts.
    pub async fn upload(
        &self,
        endpoint: &Endpoint,
        field_name: &str,
        file_name: &str,
        extra_fields: &HashMap<String, String>,
        content: impl Into<reqwest::Body>,
    ) -> Result<Reply, NetError> {
        let part = Part::stream(content)
            .file_name(file_name.to_string())
            .mime_str(UPLOAD_MIME)
            .map_err(|e| transport_error(&endpoint.url, e))?;
        let mut form = Form::new().part(field_name.to_string(), part);
        for (key, value) in extra_fields {
            form = form.text(key.clone(), value.clone());
        }

        let body = self
            .do_request(Method::POST, endpoint, RequestBody::Multipart(form))
            .await?;
        self.dispatch(&endpoint.url, body).await
    }

    /// Reads `path` and uploads it under its own file name.
    pub async fn upload_file(
        &self,
        endpoint: &Endpoint,
        field_name: &str,
        path: impl AsRef<Path>,
        extra_fields: &HashMap<String, String>,
    ) -> Result<Reply, NetError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        self.upload(endpoint, field_name, &file_name, extra_fields, content)
            .await
    }

    /// GET raw bytes, with no envelope handling.
    pub async fn get_file(&self, endpoint: &Endpoint) -> Result<Vec<u8>, NetError> {
        let body = self
            .do_request(Method::GET, endpoint, RequestBody::Empty)
            .await?;
        if body.is_empty() {
            return Err(NetError::EmptyResponse {
                url: endpoint.url.clone(),
            });
        }
        Ok(body)
    }

    /// Maps the envelope code to a reply or an error. Auth failures renew the
    /// credentials but leave retrying to the caller.
    async fn dispatch(&self, url: &str, body: Vec<u8>) -> Result<Reply, NetError> {
        let envelope = decode_envelope(url, &body)?;
        match envelope.code {
            ResponseStatus::Success => Ok(Reply { body, envelope }),
            ResponseStatus::TokenMissing => {
                self.invalidate_token().await;
                match self.get_token().await {
                    Ok(_) => Err(NetError::TokenReacquired {
                        url: url.to_string(),
                    }),
                    Err(e) => Err(NetError::TokenAcquireFailed {
                        url: url.to_string(),
                        source: Box::new(e),
                    }),
                }
            }
            ResponseStatus::TokenStale => {
                self.invalidate_token().await;
                match self.refresh_token().await {
                    Ok(_) => Err(NetError::TokenRefreshed {
                        url: url.to_string(),
                    }),
                    Err(e) => Err(NetError::TokenRefreshFailed {
                        url: url.to_string(),
                        source: Box::new(e),
                    }),
                }
            }
            ResponseStatus::Other(code) => Err(NetError::Application {
                url: url.to_string(),
                code,
                message: envelope.message,
            }),
        }
    }

    async fn invalidate_token(&self) {
        if let Err(e) = self.store.set_token("").await {
            warn!(app_id = %self.config.app_id, "Failed to invalidate token: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_envelope_errors() {
        assert!(matches!(
            decode_envelope("http://api/x", b""),
            Err(NetError::EmptyResponse { .. })
        ));
        match decode_envelope("http://api/x", b"<html>") {
            Err(NetError::Decode { body, .. }) => assert_eq!(body, "<html>"),
            other => panic!("expected decode error, got {:?}", other),
        }
        let envelope = decode_envelope("http://api/x", br#"{"code":200,"data":[1]}"#).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.message, "");
    }

    #[test]
    fn test_invalid_header_is_a_config_error() {
        let mut config = ClientConfig::new("app", "s", "http://api/login", "http://api/refresh");
        config.headers.insert("bad header".to_string(), "v".to_string());
        assert!(matches!(NetClient::new(config), Err(NetError::Config(_))));
    }

    #[test]
    fn test_new_does_no_io() {
        let mut config = ClientConfig::new("app", "s", "http://api/login", "http://api/refresh");
        config.store.driver = Some("redis".to_string());
        config.store.host = Some("203.0.113.1:6379".to_string());
        let client = NetClient::new(config).unwrap();
        assert_eq!(client.store().backend(), "redis");
        assert_eq!(client.app_id(), "app");
    }
}
