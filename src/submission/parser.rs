use serde_json::{Map, Value};

use crate::error::AppError;

/// Parse a request body into a JSON value.
///
/// An empty body, or a body sent with a non-JSON content type, parses to an
/// empty object and is left for the validator to reject.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, AppError> {
    let ct = content_type.unwrap_or("application/json");

    if !ct.contains("json") || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejecting malformed JSON body: {e}");
        AppError::InvalidPayload
    })
}
