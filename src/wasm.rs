//! Browser bridge: exposes [`Provider`] to JS hosts and adapts JS objects to
//! the [`Client`] and [`Portal`] contracts.

use std::{cell::RefCell, rc::Rc};

use async_trait::async_trait;
use gloo_utils::errors::JsError;
use js_sys::{Array, Function, Object, Promise, Reflect};
use log::error;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::{closure::Closure, prelude::*, JsCast};
use wasm_bindgen_futures::{future_to_promise, spawn_local, JsFuture};

use crate::{
    backend::{Client, Portal, PushHandler},
    domain::Id,
    emitter::{listener, Listener},
    rpc::{ErrorData, ErrorResponse, Request, RequestArguments, Response},
    Error, Provider, ProviderOptions, SendArgs,
};

fn property(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn to_js(value: &Value) -> Result<JsValue, Error> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| Error::BadParam(err.to_string()))
}

fn from_js(value: JsValue) -> Result<Value, Error> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| Error::BadParam(err.to_string()))
}

fn params_to_js(params: Option<Value>) -> Result<JsValue, Error> {
    match params {
        Some(params) => to_js(&params),
        None => Ok(JsValue::UNDEFINED),
    }
}

fn params_from_js(params: JsValue) -> Result<Option<Value>, Error> {
    if params.is_undefined() || params.is_null() {
        return Ok(None);
    }
    from_js(params).map(Some)
}

/// Rejections shaped like EIP-1193 errors keep their code and message.
fn rejection(value: JsValue) -> Error {
    let data = ErrorData::from_parts(
        property(&value, "code").and_then(|code| code.as_f64()),
        property(&value, "message").and_then(|message| message.as_string()),
        property(&value, "data").and_then(|data| from_js(data).ok()),
    );
    match data {
        Some(data) => Error::Rpc(data),
        None => match JsError::try_from(value) {
            Ok(err) => Error::JSError(err),
            Err(err) => Error::BadParam(err.to_string()),
        },
    }
}

fn into_js_error(err: Error) -> JsValue {
    let js = js_sys::Error::new(&err.to_string());
    if let Some(code) = err.code() {
        let _ = Reflect::set(&js, &JsValue::from_str("code"), &JsValue::from(code));
    }
    if let Error::Rpc(ErrorData { data: Some(data), .. }) = &err {
        if let Ok(data) = to_js(data) {
            let _ = Reflect::set(&js, &JsValue::from_str("data"), &data);
        }
    }
    js.into()
}

async fn settle(returned: Result<JsValue, JsValue>) -> Result<Value, Error> {
    let returned = returned.map_err(rejection)?;
    let resolved = JsFuture::from(Promise::resolve(&returned)).await.map_err(rejection)?;
    from_js(resolved)
}

async fn call(target: &JsValue, name: &str, args: &Array) -> Result<Value, Error> {
    let function = property(target, name)
        .and_then(|value| value.dyn_into::<Function>().ok())
        .ok_or_else(|| Error::BadParam(format!("{name} is not a function")))?;
    settle(function.apply(target, args)).await
}

/// [`Client`] over a JS object exposing `chain.id`, `account.address` and
/// `request({ method, params })`.
pub struct JsClient {
    inner: JsValue,
}

impl JsClient {
    pub fn new(inner: JsValue) -> Self {
        Self { inner }
    }
}

#[async_trait(?Send)]
impl Client for JsClient {
    fn chain_id(&self) -> Option<u64> {
        let id = property(&property(&self.inner, "chain")?, "id")?.as_f64()?;
        (id >= 0.0 && id.fract() == 0.0).then_some(id as u64)
    }

    fn account(&self) -> Option<String> {
        property(&property(&self.inner, "account")?, "address")?.as_string()
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        let args = serde_json::to_value(RequestArguments::new(method, params))?;
        call(&self.inner, "request", &Array::of1(&to_js(&args)?)).await
    }
}

/// [`Portal`] over a JS messaging client exposing
/// `request(channel, method, params)` and `subscribe(event, handler)`.
pub struct JsPortal {
    inner: JsValue,
    subscriptions: RefCell<Vec<Closure<dyn Fn(JsValue)>>>,
}

impl JsPortal {
    pub fn new(inner: JsValue) -> Self {
        Self { inner, subscriptions: RefCell::new(Vec::new()) }
    }
}

#[async_trait(?Send)]
impl Portal for JsPortal {
    async fn request(
        &self,
        channel: &str,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, Error> {
        let args = Array::of3(
            &JsValue::from_str(channel),
            &JsValue::from_str(method),
            &params_to_js(params)?,
        );
        call(&self.inner, "request", &args).await
    }

    fn subscribe(&self, event: &str, handler: PushHandler) {
        let Some(subscribe) =
            property(&self.inner, "subscribe").and_then(|value| value.dyn_into::<Function>().ok())
        else {
            error!("Portal has no subscribe function, {event} pushes are lost");
            return;
        };

        let closure = Closure::<dyn Fn(JsValue)>::new(move |data: JsValue| match from_js(data) {
            Ok(data) => handler(data),
            Err(err) => error!("Dropping undecodable push: {err}"),
        });
        if let Err(err) =
            subscribe.call2(&self.inner, &JsValue::from_str(event), closure.as_ref().unchecked_ref())
        {
            error!("Subscribing to {event} failed: {err:?}");
            return;
        }
        self.subscriptions.borrow_mut().push(closure);
    }
}

/// Reads `isRainbow`, `isMetaMask`, `chain` and the `custom`/`handlers`
/// method table off a JS options object.
fn js_options(options: &JsValue) -> Result<ProviderOptions, Error> {
    if options.is_undefined() || options.is_null() {
        return Ok(ProviderOptions::default());
    }

    let mut flags = serde_json::Map::new();
    for key in ["isRainbow", "isMetaMask"] {
        if let Some(value) = property(options, key) {
            flags.insert(key.to_string(), from_js(value)?);
        }
    }
    if let Some(chain) = property(options, "chain") {
        let hint = property(&chain, "id").unwrap_or(chain);
        flags.insert("chain".to_string(), from_js(hint)?);
    }
    let mut parsed: ProviderOptions = serde_json::from_value(Value::Object(flags))?;

    for key in ["custom", "handlers"] {
        let Some(table) = property(options, key) else {
            continue;
        };
        for entry in Object::entries(table.unchecked_ref()).iter() {
            let entry: Array = entry.unchecked_into();
            let (Some(method), Ok(handler)) =
                (entry.get(0).as_string(), entry.get(1).dyn_into::<Function>())
            else {
                continue;
            };
            parsed = parsed.with_handler(method, move |params| {
                let handler = handler.clone();
                async move {
                    let params = params_to_js(params)?;
                    settle(handler.call1(&JsValue::NULL, &params)).await
                }
            });
        }
    }

    Ok(parsed)
}

fn respond(callback: &Function, err: Option<Error>, response: &Response) {
    let err = err.map_or(JsValue::NULL, into_js_error);
    let response = match serde_json::to_value(response).map_err(Error::from).and_then(|r| to_js(&r)) {
        Ok(response) => response,
        Err(err) => {
            error!("Failed to encode response: {err}");
            JsValue::UNDEFINED
        }
    };
    if let Err(thrown) = callback.call2(&JsValue::NULL, &err, &response) {
        error!("sendAsync callback threw: {thrown:?}");
    }
}

/// JS functions registered as listeners, each with the [`Listener`] standing
/// in for it. Keyed by event name and function identity.
struct Bridges<K> {
    entries: Vec<(String, K, Listener)>,
}

impl<K: PartialEq> Bridges<K> {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn find(&self, event: &str, key: &K) -> Option<Listener> {
        self.entries
            .iter()
            .find(|(name, function, _)| name == event && function == key)
            .map(|(_, _, handle)| handle.clone())
    }

    fn insert(&mut self, event: &str, key: K, handle: Listener) {
        self.entries.push((event.to_string(), key, handle));
    }

    fn remove(&mut self, event: &str, key: &K) -> Option<Listener> {
        let index = self.entries.iter().position(|(name, function, _)| name == event && function == key)?;
        Some(self.entries.remove(index).2)
    }

    fn function(&self, handle: &Listener) -> Option<&K> {
        self.entries
            .iter()
            .find(|(_, _, known)| Rc::ptr_eq(known, handle))
            .map(|(_, function, _)| function)
    }

    fn forget(&mut self, event: Option<&str>) {
        match event {
            Some(event) => self.entries.retain(|(name, _, _)| name != event),
            None => self.entries.clear(),
        }
    }

    /// Drops entries whose listener is no longer registered, e.g. one-shot
    /// listeners that already fired.
    fn prune(&mut self, listeners: impl Fn(&str) -> Vec<Listener>) {
        self.entries.retain(|(name, _, handle)| {
            listeners(name.as_str()).iter().any(|registered| Rc::ptr_eq(registered, handle))
        });
    }
}

/// EIP-1193 provider object handed to dapps.
#[wasm_bindgen]
pub struct JsProvider {
    inner: Provider,
    bridged: RefCell<Bridges<JsValue>>,
}

#[wasm_bindgen]
impl JsProvider {
    #[wasm_bindgen(js_name = fromClient)]
    pub fn from_client(client: JsValue, options: JsValue) -> Result<JsProvider, JsValue> {
        let options = js_options(&options).map_err(into_js_error)?;
        Ok(Self::wrap(Provider::with_client(JsClient::new(client), options)))
    }

    #[wasm_bindgen(js_name = fromPortal)]
    pub fn from_portal(portal: JsValue, options: JsValue) -> Result<JsProvider, JsValue> {
        let options = js_options(&options).map_err(into_js_error)?;
        Ok(Self::wrap(Provider::with_portal(JsPortal::new(portal), options)))
    }

    pub fn request(&self, args: JsValue) -> Promise {
        let provider = self.inner.clone();
        future_to_promise(async move {
            let args: RequestArguments = serde_wasm_bindgen::from_value(args)?;
            let result = provider.request(args).await.map_err(into_js_error)?;
            to_js(&result).map_err(into_js_error)
        })
    }

    pub fn enable(&self) -> Promise {
        let provider = self.inner.clone();
        future_to_promise(async move {
            let accounts = provider.enable().await.map_err(into_js_error)?;
            let accounts: Array = accounts.iter().map(|address| JsValue::from_str(address)).collect();
            Ok(accounts.into())
        })
    }

    /// `send(method, params)`, `send(payload)` or `send(payload, callback)`.
    pub fn send(&self, method_or_payload: JsValue, params_or_callback: JsValue) -> Promise {
        let provider = self.inner.clone();
        future_to_promise(async move {
            let args = match method_or_payload.as_string() {
                Some(method) => {
                    SendArgs::Method(method, params_from_js(params_or_callback).map_err(into_js_error)?)
                }
                None => {
                    let payload: Request = serde_wasm_bindgen::from_value(method_or_payload)?;
                    match params_or_callback.dyn_into::<Function>() {
                        Ok(callback) => SendArgs::Callback(
                            payload,
                            Box::new(move |err: Option<Error>, response: Response| {
                                respond(&callback, err, &response)
                            }),
                        ),
                        Err(_) => SendArgs::Payload(payload),
                    }
                }
            };
            let result = provider.send(args).await.map_err(into_js_error)?;
            to_js(&result).map_err(into_js_error)
        })
    }

    #[wasm_bindgen(js_name = sendAsync)]
    pub fn send_async(&self, payload: JsValue, callback: Function) {
        let provider = self.inner.clone();
        spawn_local(async move {
            match serde_wasm_bindgen::from_value::<Request>(payload) {
                Ok(payload) => {
                    provider
                        .send_async(payload, |err, response| respond(&callback, err, &response))
                        .await
                }
                Err(err) => {
                    let err = Error::BadParam(err.to_string());
                    let data = ErrorData::internal(err.to_string());
                    respond(&callback, Some(err), &Response::Error(ErrorResponse::new(Id::default(), data)));
                }
            }
        });
    }

    #[wasm_bindgen(js_name = isConnected)]
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    #[wasm_bindgen(getter)]
    pub fn connected(&self) -> bool {
        self.inner.connected()
    }

    #[wasm_bindgen(getter, js_name = chainId)]
    pub fn chain_id(&self) -> Option<String> {
        self.inner.chain_id()
    }

    #[wasm_bindgen(getter, js_name = networkVersion)]
    pub fn network_version(&self) -> Option<String> {
        self.inner.network_version()
    }

    #[wasm_bindgen(getter, js_name = selectedAddress)]
    pub fn selected_address(&self) -> Option<String> {
        self.inner.selected_address()
    }

    #[wasm_bindgen(getter, js_name = isRainbow)]
    pub fn is_rainbow(&self) -> bool {
        self.inner.is_rainbow()
    }

    #[wasm_bindgen(getter, js_name = isMetaMask)]
    pub fn is_meta_mask(&self) -> bool {
        self.inner.is_meta_mask()
    }

    #[wasm_bindgen(getter, js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    pub fn on(&self, event: &str, callback: Function) {
        self.inner.on(event, self.bridge(event, callback));
    }

    #[wasm_bindgen(js_name = addListener)]
    pub fn add_listener(&self, event: &str, callback: Function) {
        self.on(event, callback)
    }

    pub fn once(&self, event: &str, callback: Function) {
        self.inner.once(event, self.bridge(event, callback));
    }

    pub fn off(&self, event: &str, callback: Function) {
        let removed = self.bridged.borrow_mut().remove(event, &callback.into());
        if let Some(handle) = removed {
            self.inner.off(event, &handle);
        }
    }

    #[wasm_bindgen(js_name = removeListener)]
    pub fn remove_listener(&self, event: &str, callback: Function) {
        self.off(event, callback)
    }

    /// Arguments travel as JSON. Values without a JSON form (functions,
    /// `undefined`, `BigInt`) reach listeners as `null`.
    pub fn emit(&self, event: &str, args: Box<[JsValue]>) -> bool {
        let args: Vec<Value> =
            args.iter().map(|arg| from_js(arg.clone()).unwrap_or(Value::Null)).collect();
        let delivered = self.inner.emit(event, &args);
        self.prune();
        delivered
    }

    #[wasm_bindgen(js_name = removeAllListeners)]
    pub fn remove_all_listeners(&self, event: Option<String>) {
        self.inner.remove_all_listeners(event.as_deref());
        self.bridged.borrow_mut().forget(event.as_deref());
    }

    #[wasm_bindgen(js_name = listenerCount)]
    pub fn listener_count(&self, event: Option<String>) -> usize {
        self.inner.listener_count(event.as_deref())
    }

    pub fn listeners(&self, event: &str) -> Array {
        self.prune();
        let bridged = self.bridged.borrow();
        self.inner
            .listeners(event)
            .iter()
            .filter_map(|handle| bridged.function(handle).cloned())
            .collect()
    }
}

impl JsProvider {
    fn wrap(inner: Provider) -> Self {
        Self { inner, bridged: RefCell::new(Bridges::new()) }
    }

    pub fn provider(&self) -> &Provider {
        &self.inner
    }

    /// Returns the listener standing in for `callback` on `event`, creating it
    /// on first use so `off` can find it again. A throwing JS listener is
    /// logged and does not stop delivery to the others.
    fn bridge(&self, event: &str, callback: Function) -> Listener {
        self.prune();
        let key: JsValue = callback.clone().into();
        let mut bridged = self.bridged.borrow_mut();
        if let Some(handle) = bridged.find(event, &key) {
            return handle;
        }

        let handle = listener(move |args: &[Value]| {
            let args: Array = args.iter().map(|arg| to_js(arg).unwrap_or(JsValue::UNDEFINED)).collect();
            if let Err(thrown) = callback.apply(&JsValue::NULL, &args) {
                error!("Listener threw: {thrown:?}");
            }
        });
        bridged.insert(event, key, handle.clone());
        handle
    }

    fn prune(&self) {
        self.bridged.borrow_mut().prune(|event| self.inner.listeners(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::EventEmitter;

    fn noop() -> Listener {
        listener(|_| {})
    }

    #[test]
    fn bridges_are_keyed_by_event_and_function() {
        let mut bridges = Bridges::new();
        let handle = noop();
        bridges.insert("connect", "a", handle.clone());

        assert!(bridges.find("connect", &"a").is_some_and(|found| Rc::ptr_eq(&found, &handle)));
        assert!(bridges.find("disconnect", &"a").is_none());
        assert!(bridges.find("connect", &"b").is_none());
        assert_eq!(bridges.function(&handle), Some(&"a"));
    }

    #[test]
    fn removed_bridges_are_released() {
        let mut bridges = Bridges::new();
        let handle = noop();
        bridges.insert("connect", "a", handle.clone());

        assert!(bridges.remove("connect", &"b").is_none());
        assert!(bridges.remove("connect", &"a").is_some());
        assert!(bridges.entries.is_empty());
        assert_eq!(Rc::strong_count(&handle), 1);
    }

    #[test]
    fn fired_once_listeners_are_pruned() {
        let emitter = EventEmitter::new();
        let mut bridges = Bridges::new();
        let persistent = noop();
        let one_shot = noop();
        emitter.on("chainChanged", persistent.clone()).once("chainChanged", one_shot.clone());
        bridges.insert("chainChanged", "persistent", persistent);
        bridges.insert("chainChanged", "one_shot", one_shot);

        emitter.emit("chainChanged", &[]);
        bridges.prune(|event| emitter.listeners(event));
        assert_eq!(bridges.entries.len(), 1);
        assert!(bridges.find("chainChanged", &"persistent").is_some());
        assert!(bridges.find("chainChanged", &"one_shot").is_none());
    }

    #[test]
    fn forget_clears_one_event_or_all() {
        let mut bridges = Bridges::new();
        bridges.insert("connect", "a", noop());
        bridges.insert("disconnect", "b", noop());

        bridges.forget(Some("connect"));
        assert_eq!(bridges.entries.len(), 1);
        bridges.forget(None);
        assert!(bridges.entries.is_empty());
    }
}
