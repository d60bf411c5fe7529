//! Error types for tokennet.

use std::time::Duration;

use thiserror::Error;

/// Every failure a [`NetClient`](crate::client::NetClient) call or a credential store can report.
#[derive(Error, Debug)]
pub enum NetError {
    /// Invalid or incomplete configuration, detected at construction time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The credential store backend could not be reached during its readiness check.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A Redis operation failed after the connection was established.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Network failure or a request reqwest refused to build.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The total deadline elapsed before the transport returned.
    #[error("request to {url} exceeded its deadline of {deadline:?}")]
    Timeout { url: String, deadline: Duration },

    /// The transport succeeded but returned an empty body.
    #[error("{url} returned no data")]
    EmptyResponse { url: String },

    /// The body is not a valid response envelope.
    #[error("{url} returned an undecodable body: {source}, with result: {body}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The server answered 401 and a fresh token was obtained; retry the call.
    #[error("{url} rejected the token, a new token was acquired")]
    TokenReacquired { url: String },

    /// The server answered 401 and the login attempt failed.
    #[error("{url} rejected the token and login failed: {source}")]
    TokenAcquireFailed {
        url: String,
        #[source]
        source: Box<NetError>,
    },

    /// The server answered 402 and the token was refreshed; retry the call.
    #[error("{url} reported a stale token, the token was refreshed")]
    TokenRefreshed { url: String },

    /// The server answered 402 and the refresh attempt failed.
    #[error("{url} reported a stale token and refresh failed: {source}")]
    TokenRefreshFailed {
        url: String,
        #[source]
        source: Box<NetError>,
    },

    /// Any business code other than 200/401/402.
    #[error("{url} returned error [{message}] ({code})")]
    Application {
        url: String,
        code: i64,
        message: String,
    },

    /// Local IO, e.g. reading a file for upload.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetError {
    /// True when the deadline, not the transport, decided the outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::Timeout { .. })
    }

    /// True when credentials were renewed and the failed call is worth repeating.
    pub fn should_retry(&self) -> bool {
        matches!(
            self,
            NetError::TokenReacquired { .. } | NetError::TokenRefreshed { .. }
        )
    }
}

/// Result type for tokennet operations.
pub type NetResult<T> = Result<T, NetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_hint_only_for_renewed_tokens() {
        let renewed = NetError::TokenRefreshed {
            url: "http://api/x".to_string(),
        };
        let failed = NetError::TokenRefreshFailed {
            url: "http://api/x".to_string(),
            source: Box::new(NetError::EmptyResponse {
                url: "http://api/refresh".to_string(),
            }),
        };
        assert!(renewed.should_retry());
        assert!(!failed.should_retry());
        assert!(failed.to_string().contains("returned no data"));
    }

    #[test]
    fn timeout_is_classified() {
        let err = NetError::Timeout {
            url: "http://api/x".to_string(),
            deadline: Duration::from_millis(50),
        };
        assert!(err.is_timeout());
        assert!(!NetError::Config("x".into()).is_timeout());
    }
}
