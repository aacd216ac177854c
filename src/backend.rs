use std::rc::Rc;

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::Middleware,
    signers::Signer,
    utils::to_checksum,
};
use serde_json::Value;

use crate::Error;

/// A wrapped Ethereum client the provider answers from and forwards to.
#[async_trait(?Send)]
pub trait Client {
    /// Chain the client is configured for, if known.
    fn chain_id(&self) -> Option<u64>;

    /// Account the client signs with, if any, spelled the way the wallet
    /// reports it.
    fn account(&self) -> Option<String>;

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, Error>;
}

/// Receives the payload of one inbound push event.
pub type PushHandler = Box<dyn Fn(Value)>;

/// Cross-context messaging portal to a wallet living elsewhere, e.g. an
/// extension background page.
#[async_trait(?Send)]
pub trait Portal {
    async fn request(
        &self,
        channel: &str,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, Error>;

    fn subscribe(&self, event: &str, handler: PushHandler);
}

#[async_trait(?Send)]
impl<T: Client + ?Sized> Client for Rc<T> {
    fn chain_id(&self) -> Option<u64> {
        (**self).chain_id()
    }

    fn account(&self) -> Option<String> {
        (**self).account()
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        (**self).request(method, params).await
    }
}

#[async_trait(?Send)]
impl<T: Portal + ?Sized> Portal for Rc<T> {
    async fn request(
        &self,
        channel: &str,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, Error> {
        (**self).request(channel, method, params).await
    }

    fn subscribe(&self, event: &str, handler: PushHandler) {
        (**self).subscribe(event, handler)
    }
}

/// An ethers signer stack: the wallet's chain and checksummed address are
/// answered locally, everything else goes to the inner provider.
#[async_trait(?Send)]
impl<M, S> Client for SignerMiddleware<M, S>
where
    M: Middleware + 'static,
    S: Signer + 'static,
{
    fn chain_id(&self) -> Option<u64> {
        Some(self.signer().chain_id())
    }

    fn account(&self) -> Option<String> {
        Some(to_checksum(&self.address(), None))
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        let params = params.unwrap_or_else(|| Value::Array(Vec::new()));
        self.provider().request(method, params).await.map_err(Error::other)
    }
}

/// The collaborator a provider was built over.
#[derive(Clone)]
pub(crate) enum Backend {
    Client(Rc<dyn Client>),
    Portal(Rc<dyn Portal>),
}
