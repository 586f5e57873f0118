//! The backend contract consumed by the client core.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use snapline_shared::types::Method;

use crate::error::NetworkError;

/// A successful (2xx) backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Parsed JSON body; `Value::Null` for empty bodies.
    pub body: Value,
}

impl Response {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Decode the body into a typed record.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, NetworkError> {
        serde_json::from_value(self.body).map_err(|e| NetworkError::Decode(e.to_string()))
    }
}

/// Generic HTTP-shaped access to the backend.
///
/// Implementations must map every non-2xx answer to
/// [`NetworkError::Status`] so callers only ever see successful
/// responses in the `Ok` arm.
#[async_trait]
pub trait RemoteDataClient: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, NetworkError>;
}
