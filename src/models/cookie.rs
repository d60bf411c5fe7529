use serde::{Deserialize, Serialize};

/// Session cookie name used by the API's PHP backend.
pub const DEFAULT_SESSION_COOKIE: &str = "PHPSESSID";

/// A server-assigned cookie kept between calls for session continuity.
///
/// Only the attributes needed to replay the cookie are kept; it serializes to
/// JSON so shared stores can hold it as a plain string value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        SessionCookie {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    /// Renders the `name=value` pair sent back in a `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Picks the cookie called `name` out of a response's cookie set.
    /// The last one wins when the server sets it twice.
    pub fn find<'a>(cookies: &'a [SessionCookie], name: &str) -> Option<&'a SessionCookie> {
        cookies.iter().rev().find(|c| c.name == name)
    }
}

impl<'a> From<reqwest::cookie::Cookie<'a>> for SessionCookie {
    fn from(cookie: reqwest::cookie::Cookie<'a>) -> Self {
        SessionCookie {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            path: cookie.path().map(str::to_string),
            domain: cookie.domain().map(str::to_string),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value() {
        let cookie = SessionCookie::new("PHPSESSID", "abc123");
        assert_eq!(cookie.header_value(), "PHPSESSID=abc123");
    }

    #[test]
    fn test_find_by_name_prefers_last() {
        let cookies = vec![
            SessionCookie::new("lang", "en"),
            SessionCookie::new("PHPSESSID", "first"),
            SessionCookie::new("PHPSESSID", "second"),
        ];
        let found = SessionCookie::find(&cookies, DEFAULT_SESSION_COOKIE).unwrap();
        assert_eq!(found.value, "second");
        assert!(SessionCookie::find(&cookies, "missing").is_none());
    }

    #[test]
    fn test_json_encoding_skips_empty_attributes() {
        let mut cookie = SessionCookie::new("PHPSESSID", "v");
        cookie.path = Some("/".to_string());
        let json = serde_json::to_string(&cookie).unwrap();
        assert!(json.contains("\"path\":\"/\""));
        assert!(!json.contains("domain"));
        let back: SessionCookie = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cookie);
    }
}
