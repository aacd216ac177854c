use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Methods a client-backed provider answers without calling the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "eth_chainId")]
    ChainId,
    #[serde(rename = "eth_accounts")]
    Accounts,
    #[serde(rename = "eth_coinbase")]
    Coinbase,
    #[serde(rename = "eth_requestAccounts")]
    RequestAccounts,
    #[serde(rename = "net_version")]
    NetVersion,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Not a locally handled method: {0}")]
pub struct UnknownMethod(pub String);

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::ChainId => "eth_chainId",
            Method::Accounts => "eth_accounts",
            Method::Coinbase => "eth_coinbase",
            Method::RequestAccounts => "eth_requestAccounts",
            Method::NetVersion => "net_version",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eth_chainId" => Ok(Method::ChainId),
            "eth_accounts" => Ok(Method::Accounts),
            "eth_coinbase" => Ok(Method::Coinbase),
            "eth_requestAccounts" => Ok(Method::RequestAccounts),
            "net_version" => Ok(Method::NetVersion),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_the_local_table() {
        for method in [
            Method::ChainId,
            Method::Accounts,
            Method::Coinbase,
            Method::RequestAccounts,
            Method::NetVersion,
        ] {
            assert_eq!(method.to_string().parse::<Method>(), Ok(method));
        }
        assert_eq!(
            "eth_sendTransaction".parse::<Method>(),
            Err(UnknownMethod("eth_sendTransaction".into()))
        );
        assert!("ETH_CHAINID".parse::<Method>().is_err());
    }
}
