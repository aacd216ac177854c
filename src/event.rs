use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Events a provider pushes to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEvent {
    #[serde(rename = "accountsChanged")]
    AccountsChanged,
    #[serde(rename = "chainChanged")]
    ChainChanged,
    #[serde(rename = "connect")]
    Connect,
    #[serde(rename = "disconnect")]
    Disconnect,
}

impl ProviderEvent {
    /// Every inbound channel a portal-backed provider subscribes to.
    pub const ALL: [ProviderEvent; 4] = [
        ProviderEvent::AccountsChanged,
        ProviderEvent::ChainChanged,
        ProviderEvent::Connect,
        ProviderEvent::Disconnect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEvent::AccountsChanged => "accountsChanged",
            ProviderEvent::ChainChanged => "chainChanged",
            ProviderEvent::Connect => "connect",
            ProviderEvent::Disconnect => "disconnect",
        }
    }
}

impl Display for ProviderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown provider event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for ProviderEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accountsChanged" => Ok(ProviderEvent::AccountsChanged),
            "chainChanged" => Ok(ProviderEvent::ChainChanged),
            "connect" => Ok(ProviderEvent::Connect),
            "disconnect" => Ok(ProviderEvent::Disconnect),
            _ => Err(UnknownEvent(s.to_string())),
        }
    }
}

/// Payload of the `connect` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    pub chain_id: String,
}
