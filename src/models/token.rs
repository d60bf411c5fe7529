use serde::{Deserialize, Serialize};

/// The `data` payload returned by the login and refresh endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct TokenData {
    /// The bearer token. Older deployments name it `X-Token` or `token`.
    #[serde(rename = "AccessToken", alias = "X-Token", alias = "token", default)]
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_every_token_field_name() {
        for body in [
            r#"{"AccessToken":"abc"}"#,
            r#"{"X-Token":"abc"}"#,
            r#"{"token":"abc"}"#,
        ] {
            let data: TokenData = serde_json::from_str(body).unwrap();
            assert_eq!(data.access_token, "abc", "failed for {}", body);
        }
    }

    #[test]
    fn test_missing_token_is_empty() {
        let data: TokenData = serde_json::from_str("{}").unwrap();
        assert!(data.access_token.is_empty());
    }
}
