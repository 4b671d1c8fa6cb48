use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::WireRequest;

/// Executes a built request and hands back the parsed JSON body.
///
/// Implementations must report network trouble as [`TransportError`] and never
/// inspect the payload's shape; that is the response validator's job.
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn execute(&self, request: &WireRequest) -> Result<Value, TransportError>;
}
