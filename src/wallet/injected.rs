//! EIP-1193 provider objects through `js-sys` Reflect calls.

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::Closure;
use wasm_bindgen_futures::JsFuture;

use walletkit_core::error::{ProviderError, codes};
use walletkit_core::provider::{InjectedProvider, Listener, ListenerId};

use crate::config::EVENT_NAMESPACE;

struct Attached {
    id: ListenerId,
    event: String,
    closure: Closure<dyn Fn(JsValue)>,
}

/// A provider object found on `window`.
///
/// Keeps every closure it hands to `provider.on` alive until the matching
/// `remove_listener`, and detaches whatever is left when dropped.
pub struct JsInjected {
    object: Object,
    attached: RefCell<Vec<Attached>>,
    next_id: Cell<ListenerId>,
}

impl JsInjected {
    pub fn new(object: Object) -> Self {
        Self {
            object,
            attached: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    fn method(&self, name: &str) -> Result<Function, ProviderError> {
        Reflect::get(&self.object, &JsValue::from_str(name))
            .map_err(provider_error)?
            .dyn_into::<Function>()
            .map_err(|_| ProviderError::new(codes::INTERNAL_ERROR, format!("provider has no {name}()")))
    }

    fn detach(&self, attached: &Attached) {
        let result = self.method("removeListener").and_then(|remove| {
            remove
                .call2(
                    &self.object,
                    &JsValue::from_str(&attached.event),
                    attached.closure.as_ref(),
                )
                .map_err(provider_error)
        });
        if let Err(err) = result {
            log::warn!(target: EVENT_NAMESPACE, "failed to remove {} listener: {err}", attached.event);
        }
    }
}

#[async_trait(?Send)]
impl InjectedProvider for JsInjected {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ProviderError> {
        // { method, params }
        let args = Object::new();
        Reflect::set(&args, &"method".into(), &JsValue::from_str(method)).map_err(provider_error)?;
        if let Some(params) = params {
            let params = params
                .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                .map_err(|e| ProviderError::new(codes::INVALID_PARAMS, e.to_string()))?;
            Reflect::set(&args, &"params".into(), &params).map_err(provider_error)?;
        }

        let promise: Promise = self
            .method("request")?
            .call1(&self.object, &args)
            .map_err(provider_error)?
            .into();
        let result = JsFuture::from(promise).await.map_err(provider_error)?;

        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|_| ProviderError::malformed(method))
    }

    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        let closure = Closure::wrap(Box::new(move |payload: JsValue| {
            let value = serde_wasm_bindgen::from_value(payload).unwrap_or(Value::Null);
            listener(value);
        }) as Box<dyn Fn(JsValue)>);

        let result = self.method("on").and_then(|on| {
            on.call2(&self.object, &JsValue::from_str(event), closure.as_ref())
                .map_err(provider_error)
        });
        if let Err(err) = result {
            log::warn!(target: EVENT_NAMESPACE, "failed to attach {event} listener: {err}");
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.attached.borrow_mut().push(Attached {
            id,
            event: event.to_string(),
            closure,
        });
        id
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        let removed = {
            let mut attached = self.attached.borrow_mut();
            attached
                .iter()
                .position(|a| a.id == id && a.event == event)
                .map(|index| attached.remove(index))
        };
        if let Some(attached) = removed {
            self.detach(&attached);
        }
    }
}

impl Drop for JsInjected {
    fn drop(&mut self) {
        for attached in std::mem::take(self.attached.get_mut()) {
            self.detach(&attached);
        }
    }
}

/// Map a rejected request to its EIP-1193 `{ code, message }`.
pub(crate) fn provider_error(err: JsValue) -> ProviderError {
    let code = Reflect::get(&err, &"code".into())
        .ok()
        .and_then(|code| code.as_f64())
        .map_or(codes::INTERNAL_ERROR, |code| code as i64);
    let message = Reflect::get(&err, &"message".into())
        .ok()
        .and_then(|message| message.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    ProviderError::new(code, message)
}
