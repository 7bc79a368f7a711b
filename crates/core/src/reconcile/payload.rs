//! Torrent payload decoding.
//!
//! Callers send the `.torrent` bytes either as a base64 string, as a string
//! of bracketed decimal bytes (`"[100,56,...]"`), or as a JSON array of
//! numbers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Torrent payload is empty")]
    Empty,

    #[error("Unsupported torrent payload: {0}")]
    Unsupported(String),
}

/// Decode the `torrent` field of a request body.
pub fn decode_torrent_payload(value: &Value) -> Result<Vec<u8>, PayloadError> {
    match value {
        Value::Null => Err(PayloadError::Empty),
        Value::String(text) => decode_text(text),
        Value::Array(items) if items.is_empty() => Err(PayloadError::Empty),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| PayloadError::Unsupported(format!("not a byte: {}", item)))
            })
            .collect(),
        other => Err(PayloadError::Unsupported(kind(other).to_string())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Object(_) => "object",
        _ => "value",
    }
}

fn decode_text(text: &str) -> Result<Vec<u8>, PayloadError> {
    let trimmed = text.trim().trim_matches('"');
    if trimmed.is_empty() {
        return Err(PayloadError::Empty);
    }

    if let Ok(bytes) = STANDARD.decode(trimmed) {
        return Ok(bytes);
    }

    let inner = trimmed.trim_start_matches('[').trim_end_matches(']');
    let bytes = inner
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u8>()
                .map_err(|_| PayloadError::Unsupported(format!("not a byte: {}", part)))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if bytes.is_empty() {
        return Err(PayloadError::Unsupported("neither base64 nor byte list".to_string()));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base64_string() {
        let encoded = STANDARD.encode(b"d8:announce0:e");
        assert_eq!(
            decode_torrent_payload(&json!(encoded)).unwrap(),
            b"d8:announce0:e".to_vec()
        );
    }

    #[test]
    fn test_quoted_base64_string() {
        let encoded = format!("\"{}\"", STANDARD.encode(b"abc"));
        assert_eq!(decode_torrent_payload(&json!(encoded)).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn test_bracketed_decimal_string() {
        assert_eq!(
            decode_torrent_payload(&json!("[100, 52, 58]")).unwrap(),
            vec![100, 52, 58]
        );
    }

    #[test]
    fn test_json_array() {
        assert_eq!(
            decode_torrent_payload(&json!([100, 101])).unwrap(),
            vec![100, 101]
        );
        assert!(matches!(
            decode_torrent_payload(&json!([300])),
            Err(PayloadError::Unsupported(_))
        ));
    }

    #[test]
    fn test_empty_and_invalid() {
        assert_eq!(decode_torrent_payload(&Value::Null), Err(PayloadError::Empty));
        assert_eq!(decode_torrent_payload(&json!("  ")), Err(PayloadError::Empty));
        assert!(matches!(
            decode_torrent_payload(&json!({"a": 1})),
            Err(PayloadError::Unsupported(_))
        ));
        assert!(matches!(
            decode_torrent_payload(&json!("not*base64")),
            Err(PayloadError::Unsupported(_))
        ));
    }
}
