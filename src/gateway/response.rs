use reqwest::{header::CONTENT_TYPE, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::options::Expect;
use crate::error::FALLBACK_MESSAGE;

/// Maximum number of characters of a plain-text error body used as a message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Decoded body of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
    /// Nothing usable: no body, or a body that did not decode.
    Empty,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// JSON view of the payload. Text is parsed when it happens to be JSON.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Payload::Binary(_) | Payload::Empty => Value::Null,
        }
    }

    /// Typed view of a JSON payload; `None` when the shape does not match.
    pub fn parse<T: DeserializeOwned>(self) -> Option<T> {
        serde_json::from_value(self.into_json()).ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Binary(bytes) => bytes,
            Payload::Text(text) => text.into_bytes(),
            Payload::Json(value) => value.to_string().into_bytes(),
            Payload::Empty => Vec::new(),
        }
    }
}

pub(crate) fn is_json_content_type(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("application/json") || v.contains("+json")
        })
        .unwrap_or(false)
}

/// Decodes a successful response. Decode failures yield `Payload::Empty`.
pub(crate) async fn decode(response: Response, expect: Expect) -> Payload {
    let wants_json = match expect {
        Expect::Json => true,
        Expect::Auto => is_json_content_type(&response),
        Expect::Blob | Expect::Text => false,
    };

    match expect {
        Expect::Blob => match response.bytes().await {
            Ok(bytes) => Payload::Binary(bytes.to_vec()),
            Err(e) => {
                tracing::debug!("Failed to read binary body: {}", e);
                Payload::Empty
            }
        },
        _ if wants_json => match response.bytes().await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Payload::Json(value),
                Err(e) => {
                    tracing::debug!("Ignoring undecodable JSON body: {}", e);
                    Payload::Empty
                }
            },
            Err(e) => {
                tracing::debug!("Failed to read body: {}", e);
                Payload::Empty
            }
        },
        _ => match response.text().await {
            Ok(text) => Payload::Text(text),
            Err(e) => {
                tracing::debug!("Failed to read text body: {}", e);
                Payload::Empty
            }
        },
    }
}

/// Raw error body: parsed JSON when possible, else the non-blank text.
pub(crate) fn error_data(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}

/// Message the server put in an error body, if any.
pub(crate) fn server_message(data: Option<&Value>) -> Option<String> {
    let message = match data? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Object(map) => ["message", "error", "detail", "msg"]
            .iter()
            .find_map(|key| match map.get(*key) {
                Some(Value::String(text)) => Some(text.trim().to_string()),
                Some(Value::Object(inner)) => inner
                    .get("message")
                    .and_then(Value::as_str)
                    .map(|text| text.trim().to_string()),
                _ => None,
            }),
        _ => None,
    }?;

    if message.is_empty() {
        None
    } else {
        Some(message.chars().take(MAX_MESSAGE_CHARS).collect())
    }
}

/// Human message for a failed call: server text, else status line, else fallback.
pub(crate) fn failure_message(status: StatusCode, data: Option<&Value>) -> String {
    if let Some(message) = server_message(data) {
        return message;
    }
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => FALLBACK_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_message_prefers_message_field() {
        let data = json!({"message": "Session expired", "error": "unauthorized"});
        assert_eq!(server_message(Some(&data)).as_deref(), Some("Session expired"));
    }

    #[test]
    fn test_server_message_reads_nested_error() {
        let data = json!({"error": {"message": "No access to payroll"}});
        assert_eq!(server_message(Some(&data)).as_deref(), Some("No access to payroll"));
    }

    #[test]
    fn test_failure_message_falls_back_to_status_line() {
        assert_eq!(failure_message(StatusCode::NOT_FOUND, None), "404 Not Found");
        let blank = json!({"message": "   "});
        assert_eq!(
            failure_message(StatusCode::INTERNAL_SERVER_ERROR, Some(&blank)),
            "500 Internal Server Error"
        );
    }

    #[test]
    fn test_failure_message_uses_generic_fallback_for_unknown_status() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(failure_message(status, None), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_error_data_keeps_plain_text() {
        assert_eq!(error_data("  "), None);
        assert_eq!(error_data("upstream down"), Some(json!("upstream down")));
        assert_eq!(error_data("{\"a\":1}"), Some(json!({"a": 1})));
    }

    #[test]
    fn test_payload_views() {
        assert_eq!(Payload::Text("{\"n\":1}".into()).into_json(), json!({"n": 1}));
        assert_eq!(Payload::Empty.into_json(), Value::Null);
        assert_eq!(Payload::Binary(vec![1, 2]).into_bytes(), vec![1, 2]);
        assert_eq!(Payload::Json(json!([1, 2])).parse::<Vec<u8>>(), Some(vec![1, 2]));
    }
}
