use serde_json::Value;

use crate::error::AppError;

/// Fields that must be present and truthy for a submission to be accepted.
pub const REQUIRED_FIELDS: [&str; 2] = ["type", "time"];

/// Accept the payload unchanged, or reject it when a required field is
/// missing or falsy. Non-object bodies never carry the fields.
pub fn validate(payload: Value) -> Result<Value, AppError> {
    let complete = REQUIRED_FIELDS
        .iter()
        .all(|field| payload.get(*field).is_some_and(is_truthy));

    if complete {
        Ok(payload)
    } else {
        Err(AppError::InvalidPayload)
    }
}

/// `null`, `false`, zero and the empty string are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
