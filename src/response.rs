//! Response classification: remote application errors first, then output
//! schema validation in either safe or strict mode.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ErrorDetail, GatewayError, RemoteError, SchemaIssue};
use crate::webservice::registry::Descriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Shape drift comes back as [`Validated::Invalid`] with the raw payload.
    #[default]
    Safe,
    /// Shape drift is an `Err(GatewayError::Shape)` that propagates through `?`.
    Strict,
}

impl FromStr for ResponseMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(ResponseMode::Safe),
            "strict" => Ok(ResponseMode::Strict),
            other => Err(GatewayError::Config(format!("unknown response mode '{}'", other))),
        }
    }
}

/// Outcome of validating a payload that arrived intact.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    Valid(T),
    Invalid { issues: Vec<SchemaIssue>, raw: Value },
}

impl<T> Validated<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validated::Valid(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validated<U> {
        match self {
            Validated::Valid(v) => Validated::Valid(f(v)),
            Validated::Invalid { issues, raw } => Validated::Invalid { issues, raw },
        }
    }

    pub fn into_result(self, descriptor: &Descriptor) -> Result<T, GatewayError> {
        match self {
            Validated::Valid(v) => Ok(v),
            Validated::Invalid { issues, raw } => Err(GatewayError::Shape {
                operation: descriptor.operation,
                issues,
                raw,
            }),
        }
    }
}

impl<T: Serialize> Validated<T> {
    /// `{success: true, data}` or `{success: false, error, raw}`.
    pub fn to_envelope(&self, descriptor: &Descriptor) -> Value {
        match self {
            Validated::Valid(data) => serde_json::json!({
                "success": true,
                "data": data,
            }),
            Validated::Invalid { issues, raw } => {
                let err = GatewayError::Shape {
                    operation: descriptor.operation,
                    issues: issues.clone(),
                    raw: Value::Null,
                };
                serde_json::json!({
                    "success": false,
                    "error": ErrorDetail::from(&err),
                    "raw": raw,
                })
            }
        }
    }
}

/// Recognises Moodle's error object (`exception`, `errorcode`, `message`, ...).
pub fn detect_remote_error(raw: &Value) -> Option<RemoteError> {
    let obj = raw.as_object()?;
    if !obj.contains_key("exception") && !obj.contains_key("errorcode") {
        return None;
    }
    let field = |name: &str| obj.get(name).and_then(Value::as_str).map(str::to_string);
    Some(RemoteError {
        exception: field("exception"),
        errorcode: field("errorcode"),
        message: field("message"),
        debuginfo: field("debuginfo"),
    })
}

/// Validates `raw` against the operation's output schema and decodes it.
///
/// Remote errors must already have been ruled out by the caller.
pub fn validate_output<T: DeserializeOwned>(descriptor: &Descriptor, raw: Value) -> Validated<T> {
    if let Err(issues) = descriptor.validate_output(&raw) {
        warn!(operation = %descriptor.operation, issues = issues.len(), "response failed schema validation");
        return Validated::Invalid { issues, raw };
    }
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) => Validated::Valid(value),
        Err(e) => {
            warn!(operation = %descriptor.operation, error = %e, "response could not be decoded");
            Validated::Invalid {
                issues: vec![SchemaIssue {
                    path: String::new(),
                    message: e.to_string(),
                }],
                raw,
            }
        }
    }
}

/// Full classification of a payload under the given mode.
pub fn classify<T: DeserializeOwned>(
    descriptor: &Descriptor,
    raw: Value,
    mode: ResponseMode,
) -> Result<Validated<T>, GatewayError> {
    if let Some(error) = detect_remote_error(&raw) {
        return Err(GatewayError::Remote {
            operation: descriptor.operation,
            error,
        });
    }
    let validated = validate_output(descriptor, raw);
    match (mode, validated) {
        (ResponseMode::Strict, invalid @ Validated::Invalid { .. }) => {
            invalid.into_result(descriptor).map(Validated::Valid)
        }
        (_, validated) => Ok(validated),
    }
}
