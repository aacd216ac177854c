pub mod backend;
pub mod domain;
pub mod emitter;
pub mod event;
pub mod options;
pub mod provider;
pub mod rpc;
pub mod serde_helpers;
pub mod wasm;

use self::rpc::{BoxError, ErrorData};

pub use self::{
    backend::{Client, Portal, PushHandler},
    domain::Id,
    emitter::{listener, EventEmitter, Listener},
    event::{ConnectInfo, ProviderEvent},
    options::{CustomHandler, ProviderOptions},
    provider::{Callback, Provider, SendArgs},
    rpc::{Request, RequestArguments, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// JSON-RPC or EIP-1193 failure. Displays as the bare message.
    #[error("{}", .0.message)]
    Rpc(ErrorData),

    #[error("Bad parameter: {0}")]
    BadParam(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    JSError(#[from] gloo_utils::errors::JsError),

    #[error(transparent)]
    Other(BoxError),
}

impl Error {
    pub fn rpc(code: i32, message: impl Into<String>) -> Self {
        Error::Rpc(ErrorData::new(code, message))
    }

    /// Wraps an arbitrary collaborator failure.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Other(err.into())
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Rpc(data) => Some(data.code),
            _ => None,
        }
    }
}

impl From<ErrorData> for Error {
    fn from(data: ErrorData) -> Self {
        Error::Rpc(data)
    }
}
