use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::{debug, error};
use serde_json::Value;

use crate::{
    backend::{Backend, Client, Portal},
    domain::{chain_id_hex, network_version},
    emitter::{EventEmitter, Listener},
    event::ProviderEvent,
    options::{CustomHandler, ProviderOptions},
    rpc::{
        ErrorData, ErrorResponse, Method, Request, RequestArguments, Response,
        SuccessfulResponse, DEFAULT_CHAIN_ID, ETH_REQUEST_CHANNEL,
    },
    serde_helpers, Error,
};

/// State cached from calls and pushes. Lives as long as the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProviderState {
    connected: bool,
    chain_id: Option<String>,
    network_version: Option<String>,
    selected_address: Option<String>,
}

impl ProviderState {
    fn set_chain_id(&mut self, chain_id: &str) {
        self.chain_id = Some(chain_id.to_string());
        self.network_version = network_version(chain_id);
    }

    fn select(&mut self, address: &str) {
        self.selected_address = Some(address.to_string());
        self.connected = true;
    }

    /// An `accountsChanged` push: the first entry is selected and the
    /// connection follows the array length.
    fn accounts_changed(&mut self, accounts: &Value) {
        self.selected_address = serde_helpers::first_account(accounts).map(str::to_string);
        self.connected = accounts.as_array().is_some_and(|accounts| !accounts.is_empty());
    }

    fn clear(&mut self) {
        self.selected_address = None;
        self.connected = false;
    }
}

/// Completion callback of the legacy `sendAsync` surface.
pub type Callback = Box<dyn FnOnce(Option<Error>, Response)>;

/// Argument shapes accepted by the legacy `send`.
pub enum SendArgs {
    /// `send(method, params)`.
    Method(String, Option<Value>),
    /// `send(payload)`.
    Payload(Request),
    /// `send(payload, callback)`, same as `sendAsync`.
    Callback(Request, Callback),
}

impl From<&str> for SendArgs {
    fn from(method: &str) -> Self {
        SendArgs::Method(method.to_string(), None)
    }
}

impl From<(&str, Value)> for SendArgs {
    fn from((method, params): (&str, Value)) -> Self {
        SendArgs::Method(method.to_string(), Some(params))
    }
}

impl From<Request> for SendArgs {
    fn from(payload: Request) -> Self {
        SendArgs::Payload(payload)
    }
}

/// EIP-1193 provider over a wrapped [`Client`] or a [`Portal`].
///
/// Clones share state and listeners.
#[derive(Clone)]
pub struct Provider {
    backend: Backend,
    handlers: Rc<HashMap<String, CustomHandler>>,
    is_rainbow: bool,
    is_meta_mask: bool,
    chain: Option<u64>,
    state: Rc<RefCell<ProviderState>>,
    events: EventEmitter,
}

impl Provider {
    pub fn with_client<C>(client: C, options: ProviderOptions) -> Self
    where
        C: Client + 'static,
    {
        Self::new(Backend::Client(Rc::new(client)), options)
    }

    /// Builds a provider over `portal` and subscribes to its push events.
    pub fn with_portal<P>(portal: P, options: ProviderOptions) -> Self
    where
        P: Portal + 'static,
    {
        let portal: Rc<dyn Portal> = Rc::new(portal);
        let provider = Self::new(Backend::Portal(portal.clone()), options);
        for event in ProviderEvent::ALL {
            let state = provider.state.clone();
            let events = provider.events.clone();
            portal.subscribe(
                event.as_str(),
                Box::new(move |data| handle_push(&state, &events, event, data)),
            );
        }
        provider
    }

    fn new(backend: Backend, options: ProviderOptions) -> Self {
        let ProviderOptions { is_rainbow, is_meta_mask, chain, handlers } = options;
        let mut state = ProviderState::default();
        if let Some(chain) = chain {
            state.set_chain_id(&chain_id_hex(chain));
        }

        Self {
            backend,
            handlers: Rc::new(handlers),
            is_rainbow,
            is_meta_mask,
            chain,
            state: Rc::new(RefCell::new(state)),
            events: EventEmitter::new(),
        }
    }

    /// Answers an EIP-1193 request.
    ///
    /// A custom handler registered for the method wins unconditionally and
    /// its result is returned untouched. Otherwise a client-backed provider
    /// answers the standard methods locally and forwards the rest, while a
    /// portal-backed provider forwards everything over the `eth_request`
    /// channel. Errors are returned as the collaborator produced them.
    pub async fn request(&self, args: RequestArguments) -> Result<Value, Error> {
        let RequestArguments { method, params } = args;

        if let Some(handler) = self.handlers.get(&method) {
            debug!("Dispatching {method} to custom handler");
            return handler(params).await;
        }

        let result = match &self.backend {
            Backend::Client(client) => self.client_request(client.as_ref(), &method, params).await?,
            Backend::Portal(portal) => {
                debug!("Forwarding {method} over {ETH_REQUEST_CHANNEL}");
                portal.request(ETH_REQUEST_CHANNEL, &method, params).await?
            }
        };

        self.observe(&method, &result);
        Ok(result)
    }

    pub async fn request_method(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        self.request(RequestArguments::new(method, params)).await
    }

    /// Legacy alias of `eth_requestAccounts`. Returns the account strings of
    /// the result, or nothing when it is not an array.
    pub async fn enable(&self) -> Result<Vec<String>, Error> {
        let result = self.request(Method::RequestAccounts.as_str().into()).await?;
        Ok(serde_helpers::accounts(&result).unwrap_or_default())
    }

    /// Legacy dual-mode `send`. The callback form resolves to `null` once the
    /// callback has run.
    pub async fn send(&self, args: SendArgs) -> Result<Value, Error> {
        match args {
            SendArgs::Method(method, params) => self.request_method(&method, params).await,
            SendArgs::Payload(payload) => self.request(payload.into()).await,
            SendArgs::Callback(payload, callback) => {
                self.send_async(payload, callback).await;
                Ok(Value::Null)
            }
        }
    }

    /// Legacy callback-style request. Failures only ever reach `callback`.
    pub async fn send_async<F>(&self, payload: Request, callback: F)
    where
        F: FnOnce(Option<Error>, Response),
    {
        let id = payload.id.clone().unwrap_or_default();
        match self.request(payload.into()).await {
            Ok(result) => callback(None, Response::Success(SuccessfulResponse::new(id, result))),
            Err(err) => {
                error!("Request {id} failed: {err}");
                let response = Response::Error(ErrorResponse::new(id, ErrorData::internal(err.to_string())));
                callback(Some(err), response);
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn connected(&self) -> bool {
        self.is_connected()
    }

    pub fn chain_id(&self) -> Option<String> {
        self.state.borrow().chain_id.clone()
    }

    pub fn network_version(&self) -> Option<String> {
        self.state.borrow().network_version.clone()
    }

    pub fn selected_address(&self) -> Option<String> {
        self.state.borrow().selected_address.clone()
    }

    pub fn is_rainbow(&self) -> bool {
        self.is_rainbow
    }

    pub fn is_meta_mask(&self) -> bool {
        self.is_meta_mask
    }

    pub fn is_ready(&self) -> bool {
        true
    }

    pub fn on(&self, event: &str, listener: Listener) -> &Self {
        self.events.on(event, listener);
        self
    }

    pub fn add_listener(&self, event: &str, listener: Listener) -> &Self {
        self.on(event, listener)
    }

    pub fn once(&self, event: &str, listener: Listener) -> &Self {
        self.events.once(event, listener);
        self
    }

    pub fn off(&self, event: &str, listener: &Listener) -> &Self {
        self.events.off(event, listener);
        self
    }

    pub fn remove_listener(&self, event: &str, listener: &Listener) -> &Self {
        self.off(event, listener)
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> bool {
        self.events.emit(event, args)
    }

    pub fn remove_all_listeners(&self, event: Option<&str>) -> &Self {
        self.events.remove_all_listeners(event);
        self
    }

    pub fn listener_count(&self, event: Option<&str>) -> usize {
        self.events.listener_count(event)
    }

    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.events.listeners(event)
    }

    async fn client_request(
        &self,
        client: &dyn Client,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, Error> {
        let Ok(local) = method.parse::<Method>() else {
            debug!("Forwarding {method} to client");
            return client.request(method, params).await;
        };

        let account = client.account();
        let chain = client.chain_id().or(self.chain).unwrap_or(DEFAULT_CHAIN_ID);
        debug!("Answering {local} locally");

        Ok(match local {
            Method::ChainId => Value::String(chain_id_hex(chain)),
            Method::NetVersion => Value::String(chain.to_string()),
            Method::Accounts | Method::RequestAccounts => {
                Value::Array(account.into_iter().map(Value::String).collect())
            }
            Method::Coinbase => account.map_or(Value::Null, Value::String),
        })
    }

    /// Caches what a successful result reveals about the wallet.
    fn observe(&self, method: &str, result: &Value) {
        match method.parse::<Method>() {
            Ok(Method::RequestAccounts) => {
                if let Some(first) = serde_helpers::first_account(result) {
                    debug!("Selected address {first}");
                    self.state.borrow_mut().select(first);
                }
            }
            Ok(Method::ChainId) => {
                if let Some(chain_id) = result.as_str() {
                    self.state.borrow_mut().set_chain_id(chain_id);
                }
            }
            _ => {}
        }
    }
}

/// Applies an inbound push to the cached state, then fans it out.
fn handle_push(
    state: &RefCell<ProviderState>,
    events: &EventEmitter,
    event: ProviderEvent,
    data: Value,
) {
    debug!("Received {event} push");
    match event {
        ProviderEvent::AccountsChanged => {
            state.borrow_mut().accounts_changed(&data);
            events.emit(event.as_str(), &[data]);
        }
        ProviderEvent::ChainChanged => {
            if let Some(chain_id) = serde_helpers::chain_id(&data) {
                state.borrow_mut().set_chain_id(&chain_id);
            }
            events.emit(event.as_str(), &[data]);
        }
        ProviderEvent::Disconnect => {
            state.borrow_mut().clear();
            events.emit(ProviderEvent::AccountsChanged.as_str(), &[Value::Array(vec![])]);
            events.emit(event.as_str(), &[]);
        }
        ProviderEvent::Connect => {
            state.borrow_mut().connected = true;
            events.emit(event.as_str(), &[data]);
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Client(_) => "client",
            Backend::Portal(_) => "portal",
        };
        f.debug_struct("Provider")
            .field("backend", &backend)
            .field("state", &*self.state.borrow())
            .field("is_rainbow", &self.is_rainbow)
            .field("is_meta_mask", &self.is_meta_mask)
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    struct Offline;

    #[async_trait::async_trait(?Send)]
    impl Client for Offline {
        fn chain_id(&self) -> Option<u64> {
            None
        }

        fn account(&self) -> Option<String> {
            None
        }

        async fn request(&self, method: &str, _: Option<Value>) -> Result<Value, Error> {
            Err(Error::Rpc(ErrorData::new(crate::rpc::UNSUPPORTED_METHOD, format!("{method} unsupported"))))
        }
    }

    #[test]
    fn chain_hint_seeds_state_and_local_answers() {
        let provider = Provider::with_client(Offline, ProviderOptions::new().chain(10));
        assert_eq!(provider.chain_id().as_deref(), Some("0xa"));
        assert_eq!(provider.network_version().as_deref(), Some("10"));
        assert_eq!(block_on(provider.request_method("net_version", None)).unwrap(), json!("10"));
    }

    #[test]
    fn unknown_chain_defaults_to_mainnet() {
        let provider = Provider::with_client(Offline, ProviderOptions::default());
        assert_eq!(provider.chain_id(), None);
        assert_eq!(block_on(provider.request("eth_chainId".into())).unwrap(), json!("0x1"));
        assert_eq!(provider.chain_id().as_deref(), Some("0x1"));
        assert_eq!(provider.network_version().as_deref(), Some("1"));
    }

    #[test]
    fn no_account_means_no_connection() {
        let provider = Provider::with_client(Offline, ProviderOptions::default());
        assert_eq!(block_on(provider.request("eth_requestAccounts".into())).unwrap(), json!([]));
        assert_eq!(block_on(provider.request("eth_coinbase".into())).unwrap(), Value::Null);
        assert!(block_on(provider.enable()).unwrap().is_empty());
        assert!(!provider.is_connected());
        assert_eq!(provider.selected_address(), None);
    }

    #[test]
    fn accounts_changed_follows_array_length() {
        let mut state = ProviderState::default();
        state.accounts_changed(&json!(["0xabc", "0x123"]));
        assert!(state.connected);
        assert_eq!(state.selected_address.as_deref(), Some("0xabc"));

        state.accounts_changed(&json!([7]));
        assert!(state.connected);
        assert_eq!(state.selected_address, None);

        state.accounts_changed(&json!([]));
        assert!(!state.connected);
        assert_eq!(state.selected_address, None);
    }

    #[test]
    fn flags_and_debug() {
        let provider =
            Provider::with_client(Offline, ProviderOptions::new().rainbow(false).meta_mask(true));
        assert!(!provider.is_rainbow());
        assert!(provider.is_meta_mask());
        assert!(provider.is_ready());
        assert!(format!("{provider:?}").contains("client"));
    }
}
