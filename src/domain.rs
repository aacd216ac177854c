use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// JSON-RPC message id. Numbers and strings are both accepted from callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

impl Default for Id {
    fn default() -> Self {
        Id::Number(1)
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Id::Number(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::String(value.to_string())
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Id::Number(id) => write!(f, "{id}"),
            Id::String(id) => f.write_str(id),
        }
    }
}

/// Formats a chain id the way `eth_chainId` reports it: `0x`-prefixed lowercase hex.
pub fn chain_id_hex(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

/// Parses a hex chain id, with or without prefix.
pub fn parse_chain_id(chain_id: &str) -> Option<u64> {
    let digits = chain_id
        .strip_prefix("0x")
        .or_else(|| chain_id.strip_prefix("0X"))
        .unwrap_or(chain_id);
    u64::from_str_radix(digits, 16).ok()
}

/// Decimal rendering of a hex chain id, as `net_version` reports it.
pub fn network_version(chain_id: &str) -> Option<String> {
    parse_chain_id(chain_id).map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_formatting() {
        assert_eq!(chain_id_hex(1), "0x1");
        assert_eq!(chain_id_hex(137), "0x89");
        assert_eq!(chain_id_hex(11155111), "0xaa36a7");
    }

    #[test]
    fn network_version_from_hex() {
        assert_eq!(network_version("0x1").as_deref(), Some("1"));
        assert_eq!(network_version("0X89").as_deref(), Some("137"));
        assert_eq!(network_version("a").as_deref(), Some("10"));
        assert_eq!(network_version("0xzz"), None);
        assert_eq!(network_version(""), None);
    }

    #[test]
    fn ids() {
        assert_eq!(Id::default(), Id::Number(1));
        assert_eq!(serde_json::to_string(&Id::from("x")).unwrap(), "\"x\"");
        assert_eq!(serde_json::from_str::<Id>("7").unwrap(), Id::Number(7));
    }
}
