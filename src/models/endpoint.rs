use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Envelope;
use crate::error::NetError;

/// A target URL and whether calls to it carry the bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub auth: bool,
}

impl Endpoint {
    /// An endpoint that requires the bearer token and session cookie.
    pub fn authenticated(url: impl Into<String>) -> Self {
        Endpoint {
            url: url.into(),
            auth: true,
        }
    }

    /// An endpoint called without credentials. Session cookies it returns are kept.
    pub fn public(url: impl Into<String>) -> Self {
        Endpoint {
            url: url.into(),
            auth: false,
        }
    }
}

/// A successful (`code == 200`) answer: the raw body and its decoded envelope.
#[derive(Clone, Debug)]
pub struct Reply {
    pub body: Vec<u8>,
    pub envelope: Envelope<Value>,
}

impl Reply {
    /// Decodes the envelope's `data` field into a caller-defined type.
    pub fn data<T: DeserializeOwned>(&self, url: &str) -> Result<T, NetError> {
        serde_json::from_value(self.envelope.data.clone()).map_err(|source| NetError::Decode {
            url: url.to_string(),
            source,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}
