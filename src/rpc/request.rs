use super::{super::domain::Id, JSON_RPC_VERSION_STR};
use serde::{Deserialize, Serialize};

/// The `{method, params}` argument of an EIP-1193 `request` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self { method: method.into(), params }
    }
}

impl From<&str> for RequestArguments {
    fn from(method: &str) -> Self {
        Self::new(method, None)
    }
}

/// Data structure representing a legacy JSON RPC payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// ID this message corresponds to. Replies default to `1` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    /// The JSON RPC version.
    #[serde(default = "json_rpc_version")]
    pub jsonrpc: String,

    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

fn json_rpc_version() -> String {
    JSON_RPC_VERSION_STR.to_string()
}

impl Request {
    /// Create a new instance.
    pub fn new(id: Option<Id>, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self { id, jsonrpc: json_rpc_version(), method: method.into(), params }
    }

    pub fn arguments(&self) -> RequestArguments {
        RequestArguments { method: self.method.clone(), params: self.params.clone() }
    }
}

impl From<Request> for RequestArguments {
    fn from(request: Request) -> Self {
        Self { method: request.method, params: request.params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_without_id_or_version() {
        let request: Request = serde_json::from_value(json!({ "method": "eth_chainId" })).unwrap();
        assert_eq!(request.id, None);
        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.params, None);
    }

    #[test]
    fn string_ids_survive() {
        let request: Request = serde_json::from_value(json!({
            "id": "abc",
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [{ "to": "0x0" }, "latest"]
        }))
        .unwrap();
        assert_eq!(request.id, Some(Id::String("abc".into())));
        assert_eq!(request.arguments().params, Some(json!([{ "to": "0x0" }, "latest"])));
    }
}
