use std::collections::HashMap;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::store::StoreConfig;
use crate::error::NetError;
use crate::models::DEFAULT_SESSION_COOKIE;

/// Everything one application needs to talk to the API.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq, Eq)]
pub struct ClientConfig {
    pub app_id: String,
    pub app_secret: String,
    pub login_url: String,
    pub refresh_url: String,
    /// Form body posted to `login_url`. Built from the app credentials when omitted.
    #[serde(default)]
    pub login_data: Option<String>,
    #[serde(default = "default_app_type")]
    pub app_type: String,
    /// Total wall-clock budget of a single call.
    #[serde(default = "default_deadline")]
    pub deadline_in_ms: u64,
    /// Timeout handed to the HTTP transport itself.
    #[serde(default = "default_timeout")]
    pub timeout_in_ms: u64,
    /// Extra headers set on every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_token_header")]
    pub token_header: String,
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_app_type() -> String {
    "hospital".to_string()
}

fn default_deadline() -> u64 {
    5_000
}

fn default_timeout() -> u64 {
    10_000
}

fn default_token_header() -> String {
    "X-Token".to_string()
}

fn default_session_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

impl ClientConfig {
    /// A config with every optional field at its default.
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        login_url: impl Into<String>,
        refresh_url: impl Into<String>,
    ) -> Self {
        ClientConfig {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            login_url: login_url.into(),
            refresh_url: refresh_url.into(),
            login_data: None,
            app_type: default_app_type(),
            deadline_in_ms: default_deadline(),
            timeout_in_ms: default_timeout(),
            headers: HashMap::new(),
            token_header: default_token_header(),
            session_cookie_name: default_session_cookie_name(),
            store: StoreConfig::default(),
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_in_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    /// The form body for the login request.
    pub fn login_body(&self) -> String {
        match &self.login_data {
            Some(data) => data.clone(),
            None => form_urlencoded::Serializer::new(String::new())
                .append_pair("appid", &self.app_id)
                .append_pair("appsecret", &self.app_secret)
                .append_pair("apptype", &self.app_type)
                .finish(),
        }
    }

    /// Checks the fields that cannot be defaulted.
    pub fn validate(&self) -> Result<(), NetError> {
        let required = [
            ("app_id", &self.app_id),
            ("login_url", &self.login_url),
            ("refresh_url", &self.refresh_url),
            ("token_header", &self.token_header),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(NetError::Config(format!(
                "client '{}': {} must not be empty",
                self.app_id, name
            )));
        }
        if self.deadline_in_ms == 0 || self.timeout_in_ms == 0 {
            return Err(NetError::Config(format!(
                "client '{}': deadline_in_ms and timeout_in_ms must be greater than zero",
                self.app_id
            )));
        }
        Ok(())
    }
}
