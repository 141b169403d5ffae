//! Response boundary
//!
//! Every value leaving the library passes through here once: serialised to
//! JSON, floats rounded, non-finite numbers nulled, errors mapped to a
//! status and a `{ error, message }` body.

use serde::Serialize;
use serde_json::{json, Map, Number, Value};

use crate::{NbaError, Result};

/// Decimal places kept in responses
pub const DECIMALS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Recursively convert a JSON value into plain, finite, rounded numbers
pub fn to_plain(value: Value) -> Value {
    match value {
        Value::Number(n) => plain_number(n),
        Value::Array(items) => Value::Array(items.into_iter().map(to_plain).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, to_plain(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn plain_number(n: Number) -> Value {
    if n.is_i64() || n.is_u64() {
        return Value::Number(n);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => {
            let factor = 10f64.powi(DECIMALS as i32);
            let rounded = (f * factor).round() / factor;
            Number::from_f64(rounded).map(Value::Number).unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

/// Serialise any response type through the plain-value conversion
pub fn plain<T: Serialize>(value: &T) -> Result<Value> {
    Ok(to_plain(serde_json::to_value(value)?))
}

pub fn error_body(err: &NbaError) -> Value {
    json!({
        "error": err.kind(),
        "message": err.to_string(),
    })
}

/// Turn an operation result into a status code and JSON body
pub fn respond<T: Serialize>(result: Result<T>) -> ApiResponse {
    let outcome = result.and_then(|value| plain(&value));
    match outcome {
        Ok(body) => ApiResponse { status: 200, body },
        Err(err) => {
            if err.status_code() >= 500 {
                log::error!("{}", err);
            } else {
                log::debug!("{}: {}", err.kind(), err);
            }
            ApiResponse {
                status: err.status_code(),
                body: error_body(&err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::describe;

    #[test]
    fn test_rounds_nested_floats() {
        let value = json!({"a": [1.234567891, {"b": 2.0}], "c": 3, "d": "x"});
        let plain = to_plain(value);
        assert_eq!(plain["a"][0], json!(1.2346));
        assert_eq!(plain["a"][1]["b"], json!(2.0));
        assert_eq!(plain["c"], json!(3));
        assert_eq!(plain["d"], json!("x"));
    }

    #[test]
    fn test_empty_bundle_serialises_nulls() {
        let response = respond(Ok(describe(&[])));
        assert_eq!(response.status, 200);
        assert_eq!(response.body["mean"], Value::Null);
        assert_eq!(response.body["standard_deviation"], Value::Null);
        assert_eq!(response.body["count"], json!(0));
    }

    #[test]
    fn test_error_mapping() {
        let response = respond::<()>(Err(NbaError::NotFound("player 1".to_string())));
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body["error"], json!("not_found"));

        let response = respond::<()>(Err(NbaError::LowVariance {
            std: 0.0,
            threshold: 0.01,
        }));
        assert_eq!(response.status, 422);
        assert_eq!(response.body["error"], json!("low_variance"));
    }
}
