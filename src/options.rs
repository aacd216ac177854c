use std::{collections::HashMap, fmt, future::Future, rc::Rc};

use futures::{future::LocalBoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::Value;

use crate::Error;

pub type HandlerFuture = LocalBoxFuture<'static, Result<Value, Error>>;

/// Replacement for the standard handling of one method.
pub type CustomHandler = Rc<dyn Fn(Option<Value>) -> HandlerFuture>;

/// Construction options of a [`crate::Provider`].
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderOptions {
    pub is_rainbow: bool,
    pub is_meta_mask: bool,
    /// Chain to assume until one is reported.
    #[serde(deserialize_with = "crate::serde_helpers::chain_hint")]
    pub chain: Option<u64>,
    #[serde(skip)]
    pub handlers: HashMap<String, CustomHandler>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self { is_rainbow: true, is_meta_mask: true, chain: None, handlers: HashMap::new() }
    }
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rainbow(mut self, is_rainbow: bool) -> Self {
        self.is_rainbow = is_rainbow;
        self
    }

    pub fn meta_mask(mut self, is_meta_mask: bool) -> Self {
        self.is_meta_mask = is_meta_mask;
        self
    }

    pub fn chain(mut self, chain_id: u64) -> Self {
        self.chain = Some(chain_id);
        self
    }

    /// Routes `method` to `handler` ahead of any standard handling.
    pub fn with_handler<F, Fut>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + 'static,
        Fut: Future<Output = Result<Value, Error>> + 'static,
    {
        let handler: CustomHandler = Rc::new(move |params| handler(params).boxed_local());
        self.handlers.insert(method.into(), handler);
        self
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("is_rainbow", &self.is_rainbow)
            .field("is_meta_mask", &self.is_meta_mask)
            .field("chain", &self.chain)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
