use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::value::value_to_string;

/// Business status carried in the envelope's `code` field.
///
/// This numbering is independent of the HTTP status line: a `200 OK` transport
/// response routinely carries `401` or `402` here.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(from = "i64", into = "i64")]
pub enum ResponseStatus {
    Success,
    /// No valid token, a new one must be acquired.
    TokenMissing,
    /// The token is known but stale, it must be refreshed.
    TokenStale,
    Other(i64),
}

impl From<i64> for ResponseStatus {
    fn from(code: i64) -> Self {
        match code {
            200 => ResponseStatus::Success,
            401 => ResponseStatus::TokenMissing,
            402 => ResponseStatus::TokenStale,
            other => ResponseStatus::Other(other),
        }
    }
}

impl From<ResponseStatus> for i64 {
    fn from(status: ResponseStatus) -> Self {
        match status {
            ResponseStatus::Success => 200,
            ResponseStatus::TokenMissing => 401,
            ResponseStatus::TokenStale => 402,
            ResponseStatus::Other(code) => code,
        }
    }
}

/// The `{code, message, data}` wrapper used by every endpoint of the API.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Envelope<T = Value> {
    pub code: ResponseStatus,
    #[serde(default, deserialize_with = "lenient_message")]
    pub message: String,
    #[serde(default)]
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == ResponseStatus::Success
    }
}

/// Servers occasionally send numbers or null as the message.
fn lenient_message<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        other => value_to_string(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenData;

    #[test]
    fn test_status_codes_map_both_ways() {
        assert_eq!(ResponseStatus::from(200), ResponseStatus::Success);
        assert_eq!(ResponseStatus::from(401), ResponseStatus::TokenMissing);
        assert_eq!(ResponseStatus::from(402), ResponseStatus::TokenStale);
        assert_eq!(ResponseStatus::from(500), ResponseStatus::Other(500));
        assert_eq!(i64::from(ResponseStatus::TokenStale), 402);
    }

    #[test]
    fn test_decode_envelope_without_data() {
        let env: Envelope = serde_json::from_str(r#"{"code":403,"message":"denied"}"#).unwrap();
        assert_eq!(env.code, ResponseStatus::Other(403));
        assert_eq!(env.message, "denied");
        assert_eq!(env.data, Value::Null);
    }

    #[test]
    fn test_decode_numeric_and_null_message() {
        let env: Envelope = serde_json::from_str(r#"{"code":500,"message":42}"#).unwrap();
        assert_eq!(env.message, "42");
        let env: Envelope = serde_json::from_str(r#"{"code":200,"message":null}"#).unwrap();
        assert_eq!(env.message, "");
        assert!(env.is_success());
    }

    #[test]
    fn test_decode_typed_token_envelope() {
        let env: Envelope<TokenData> = serde_json::from_str(
            r#"{"code":200,"message":"ok","data":{"AccessToken":"t-1"}}"#,
        )
        .unwrap();
        assert_eq!(env.data.access_token, "t-1");
    }

    #[test]
    fn test_missing_code_is_a_decode_error() {
        let res: Result<Envelope, _> = serde_json::from_str(r#"{"message":"x"}"#);
        assert!(res.is_err());
    }
}
