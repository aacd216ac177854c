use super::{super::domain::Id, ErrorData, JSON_RPC_VERSION_STR};
use serde::{Deserialize, Serialize};

/// Enum representing a JSON RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// A response with a result.
    Success(SuccessfulResponse),

    /// A response for a failed request.
    Error(ErrorResponse),
}

impl Response {
    pub fn id(&self) -> &Id {
        match self {
            Self::Success(response) => &response.id,
            Self::Error(response) => &response.id,
        }
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success(response) => Some(&response.result),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorData> {
        match self {
            Self::Success(_) => None,
            Self::Error(response) => Some(&response.error),
        }
    }
}

/// Data structure representing a successful JSON RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessfulResponse {
    /// ID this message corresponds to.
    pub id: Id,

    /// RPC version.
    pub jsonrpc: String,

    /// The result for the message.
    pub result: serde_json::Value,
}

impl SuccessfulResponse {
    /// Create a new instance.
    pub fn new(id: Id, result: serde_json::Value) -> Self {
        Self { id, jsonrpc: JSON_RPC_VERSION_STR.to_string(), result }
    }
}

/// Data structure representing a JSON RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// ID this message corresponds to.
    pub id: Id,

    /// RPC version.
    pub jsonrpc: String,

    /// The ErrorResponse corresponding to this message.
    pub error: ErrorData,
}

impl ErrorResponse {
    /// Create a new instance.
    pub fn new(id: Id, error: ErrorData) -> Self {
        Self { id, jsonrpc: JSON_RPC_VERSION_STR.to_string(), error }
    }
}
