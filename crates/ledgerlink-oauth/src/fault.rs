//! Normalization of the vendor's fault envelope.
//!
//! The accounting API reports errors as a nested fault object holding a list
//! of error records. Depending on the endpoint the keys arrive as
//! `Fault`/`Error`/`Message` or `fault`/`error`/`message`, so every lookup
//! here is case-insensitive. The token endpoint uses the plain OAuth
//! `{error, error_description}` shape instead; both are folded into
//! [`UpstreamFault`].

use serde::Serialize;
use serde_json::Value;

/// Vendor fault code for an invalid or expired access token.
pub const AUTH_FAULT_CODE: &str = "3200";

/// One error record from a fault envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FaultDetail {
    pub message: Option<String>,
    pub detail: Option<String>,
    pub code: Option<String>,
    pub element: Option<String>,
}

/// A normalized upstream error.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamFault {
    /// HTTP status of the failed response.
    pub status: u16,
    /// Human-readable message from the first error record.
    pub message: String,
    /// Vendor error code of the first error record.
    pub code: Option<String>,
    /// Extended detail of the first error record.
    pub detail: Option<String>,
    /// Fault type (`ValidationFault`, `AUTHENTICATION`, ...).
    pub fault_type: Option<String>,
    /// All error records in the envelope.
    pub errors: Vec<FaultDetail>,
    /// Original payload, kept for diagnostics.
    pub raw: Value,
}

impl UpstreamFault {
    /// Build a fault from a raw response body. Bodies that are not JSON are
    /// kept as a string payload.
    pub fn from_body(status: u16, body: &str) -> Self {
        let raw = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
        };
        Self::from_value(status, raw)
    }

    /// Build a fault from an already-parsed payload.
    pub fn from_value(status: u16, raw: Value) -> Self {
        let fault = get_ci(&raw, "fault");

        let errors: Vec<FaultDetail> = fault
            .and_then(|f| get_ci(f, "error"))
            .and_then(Value::as_array)
            .map(|records| records.iter().map(parse_detail).collect())
            .unwrap_or_default();

        let fault_type = fault.and_then(|f| get_ci(f, "type")).and_then(as_text);

        // OAuth token endpoint shape.
        let oauth_error = get_ci(&raw, "error").and_then(Value::as_str);
        let oauth_description = get_ci(&raw, "error_description").and_then(Value::as_str);

        let first = errors.first();
        let code = first
            .and_then(|e| e.code.clone())
            .or_else(|| oauth_error.map(str::to_string));
        let detail = first.and_then(|e| e.detail.clone());

        let message = first
            .and_then(|e| e.message.clone().or_else(|| e.detail.clone()))
            .or_else(|| oauth_description.map(str::to_string))
            .or_else(|| oauth_error.map(str::to_string))
            .or_else(|| get_ci(&raw, "message").and_then(as_text))
            .or_else(|| match &raw {
                Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                _ => None,
            })
            .unwrap_or_else(|| format!("HTTP {}", status));

        Self {
            status,
            message,
            code,
            detail,
            fault_type,
            errors,
            raw,
        }
    }

    /// Whether any error record (or the top-level code) carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
            || self.errors.iter().any(|e| e.code.as_deref() == Some(code))
    }

    /// Whether this fault signals an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.has_code(AUTH_FAULT_CODE)
    }
}

impl std::fmt::Display for UpstreamFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (HTTP {}", self.message, self.status)?;
        if let Some(code) = &self.code {
            write!(f, ", code {}", code)?;
        }
        write!(f, ")")
    }
}

/// Case-insensitive object key lookup.
fn get_ci<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Strings pass through; numeric codes are rendered.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_detail(record: &Value) -> FaultDetail {
    FaultDetail {
        message: get_ci(record, "message").and_then(as_text),
        detail: get_ci(record, "detail").and_then(as_text),
        code: get_ci(record, "code").and_then(as_text),
        element: get_ci(record, "element").and_then(as_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_case_envelope() {
        let body = r#"{
            "Fault": {
                "Error": [{
                    "Message": "message=AuthenticationFailed; errorCode=003200; statusCode=401",
                    "Detail": "Token expired",
                    "code": "3200"
                }],
                "type": "AUTHENTICATION"
            },
            "time": "2024-03-01T10:00:00.000-08:00"
        }"#;

        let fault = UpstreamFault::from_body(401, body);
        assert_eq!(fault.code.as_deref(), Some("3200"));
        assert_eq!(fault.detail.as_deref(), Some("Token expired"));
        assert_eq!(fault.fault_type.as_deref(), Some("AUTHENTICATION"));
        assert!(fault.message.contains("AuthenticationFailed"));
        assert!(fault.is_auth_failure());
    }

    #[test]
    fn test_lower_case_envelope() {
        let body = r#"{
            "fault": {
                "error": [{
                    "message": "Duplicate Name Exists Error",
                    "detail": "The name supplied already exists. : Id=81",
                    "code": "6240",
                    "element": "Name"
                }],
                "type": "ValidationFault"
            }
        }"#;

        let fault = UpstreamFault::from_body(400, body);
        assert_eq!(fault.message, "Duplicate Name Exists Error");
        assert_eq!(fault.errors[0].element.as_deref(), Some("Name"));
        assert!(fault.has_code("6240"));
        assert!(!fault.is_auth_failure());
    }

    #[test]
    fn test_auth_code_on_non_401_status() {
        let body = r#"{"Fault":{"Error":[{"Message":"AuthorizationFailure","code":3200}]}}"#;
        let fault = UpstreamFault::from_body(403, body);
        assert_eq!(fault.code.as_deref(), Some("3200"));
        assert!(fault.is_auth_failure());
    }

    #[test]
    fn test_oauth_error_shape() {
        let body = r#"{"error":"invalid_grant","error_description":"Token invalid"}"#;
        let fault = UpstreamFault::from_body(400, body);
        assert_eq!(fault.code.as_deref(), Some("invalid_grant"));
        assert_eq!(fault.message, "Token invalid");
        assert!(fault.errors.is_empty());
    }

    #[test]
    fn test_non_json_body_kept_raw() {
        let fault = UpstreamFault::from_body(502, "Bad Gateway");
        assert_eq!(fault.message, "Bad Gateway");
        assert_eq!(fault.raw, Value::String("Bad Gateway".to_string()));
    }

    #[test]
    fn test_empty_body_falls_back_to_status() {
        let fault = UpstreamFault::from_body(500, "");
        assert_eq!(fault.message, "HTTP 500");
        assert_eq!(fault.raw, Value::Null);
        assert_eq!(fault.to_string(), "HTTP 500 (HTTP 500)");
    }
}
