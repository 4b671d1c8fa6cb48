use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorDetail, GatewayError, Result};

/// Uniform result shape of a usecase: either `data` or a single `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsecaseEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Upstream payload kept when the failure was a shape mismatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl<T> UsecaseEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            raw: None,
        }
    }

    pub fn failed(err: &GatewayError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorDetail::from(err)),
            raw: err.raw_payload().cloned(),
        }
    }
}

impl<T> From<Result<T>> for UsecaseEnvelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failed(&err),
        }
    }
}

/// Result of a fan-out usecase. `success` means the batch ran; per-item
/// failures are reported in `outcomes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanOutEnvelope<T> {
    pub success: bool,
    pub outcomes: Vec<T>,
    pub succeeded: usize,
    pub failed: usize,
}

impl<T> FanOutEnvelope<T> {
    pub fn from_outcomes(outcomes: Vec<T>, is_success: impl Fn(&T) -> bool) -> Self {
        let succeeded = outcomes.iter().filter(|o| is_success(o)).count();
        Self {
            success: true,
            failed: outcomes.len() - succeeded,
            succeeded,
            outcomes,
        }
    }
}
