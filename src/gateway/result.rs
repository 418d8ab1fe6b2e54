//! Invocation result coercion
//!
//! Handlers return an untyped value shaped like
//! `{ statusCode?, headers?, body? }`. The gateway validates and
//! coerces it into a typed result at the boundary instead of trusting
//! duck-typed access; anything that does not fit is a contract
//! violation.

use crate::error::{GatewayError, Result as GatewayResult};
use hyper::StatusCode;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub status_code: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl InvocationResult {
    /// Coerce a handler's raw JSON return value.
    ///
    /// Missing fields take the documented defaults: status 200, empty
    /// headers, empty body.
    pub fn from_value(value: &Value) -> GatewayResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            GatewayError::ContractViolation(format!("expected a JSON object result, got {value}"))
        })?;

        let status_code = match map.get("statusCode") {
            None | Some(Value::Null) => StatusCode::OK,
            Some(Value::Number(n)) => {
                let code = n.as_u64().and_then(|c| u16::try_from(c).ok()).ok_or_else(
                    || GatewayError::ContractViolation(format!("invalid statusCode: {n}")),
                )?;
                StatusCode::from_u16(code).map_err(|_| {
                    GatewayError::ContractViolation(format!("invalid statusCode: {code}"))
                })?
            }
            Some(other) => {
                return Err(GatewayError::ContractViolation(format!(
                    "statusCode must be a number, got {other}"
                )))
            }
        };

        let headers = match map.get("headers") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(entries)) => {
                let mut headers = HashMap::new();
                for (name, value) in entries {
                    headers.insert(name.clone(), coerce_scalar(name, value)?);
                }
                headers
            }
            Some(other) => {
                return Err(GatewayError::ContractViolation(format!(
                    "headers must be an object, got {other}"
                )))
            }
        };

        let body = match map.get("body") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            // Non-string bodies are re-serialized to their JSON text.
            Some(other) => other.to_string(),
        };

        Ok(Self {
            status_code,
            headers,
            body,
        })
    }
}

fn coerce_scalar(name: &str, value: &Value) -> GatewayResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(GatewayError::ContractViolation(format!(
            "header '{name}' has non-scalar value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_fills_defaults() {
        let result = InvocationResult::from_value(&json!({})).unwrap();
        assert_eq!(result.status_code, StatusCode::OK);
        assert!(result.headers.is_empty());
        assert_eq!(result.body, "");
    }

    #[test]
    fn test_status_code_only() {
        let result = InvocationResult::from_value(&json!({ "statusCode": 201 })).unwrap();
        assert_eq!(result.status_code, StatusCode::CREATED);
        assert!(result.headers.is_empty());
        assert_eq!(result.body, "");
    }

    #[test]
    fn test_full_result() {
        let result = InvocationResult::from_value(&json!({
            "statusCode": 404,
            "headers": { "X-Custom": "yes", "X-Count": 3 },
            "body": "missing",
        }))
        .unwrap();
        assert_eq!(result.status_code, StatusCode::NOT_FOUND);
        assert_eq!(result.headers.get("X-Custom"), Some(&"yes".to_string()));
        assert_eq!(result.headers.get("X-Count"), Some(&"3".to_string()));
        assert_eq!(result.body, "missing");
    }

    #[test]
    fn test_non_string_body_reserialized() {
        let result = InvocationResult::from_value(&json!({ "body": { "got": 1 } })).unwrap();
        assert_eq!(result.body, r#"{"got":1}"#);
    }

    #[test]
    fn test_non_object_result_rejected() {
        let err = InvocationResult::from_value(&json!("ok")).unwrap_err();
        assert!(matches!(err, GatewayError::ContractViolation(_)));
    }

    #[test]
    fn test_invalid_status_code_rejected() {
        assert!(InvocationResult::from_value(&json!({ "statusCode": 99 })).is_err());
        assert!(InvocationResult::from_value(&json!({ "statusCode": "200" })).is_err());
    }

    #[test]
    fn test_non_scalar_header_rejected() {
        let err =
            InvocationResult::from_value(&json!({ "headers": { "X-Bad": [1, 2] } })).unwrap_err();
        assert!(matches!(err, GatewayError::ContractViolation(_)));
    }
}
