use log::error;
use serde_json::Value;

use crate::error::ApiError;

const BODY_LOG_LIMIT: usize = 300;

/// Turns a raw HTTP response into the JSON payload or a user-facing error.
pub fn interpret_response(status: u16, body: &str) -> Result<Value, ApiError> {
    let data: Value = if body.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => {
                let snippet: String = body.chars().take(BODY_LOG_LIMIT).collect();
                error!("Invalid JSON response ({status}): {snippet}");
                return Err(ApiError::InvalidResponse);
            }
        }
    };

    if !(200..300).contains(&status) {
        return Err(ApiError::Rejected {
            status,
            message: rejection_message(status, &data),
        });
    }

    Ok(data)
}

fn rejection_message(status: u16, data: &Value) -> String {
    ["message", "error"]
        .iter()
        .filter_map(|field| data.get(*field).and_then(Value::as_str))
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
