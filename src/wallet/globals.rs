//! Installation probes against the real `window`.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Object;

use walletkit_core::provider::{Globals, InjectedProvider};

use super::injected::JsInjected;
use crate::utils::dom;

/// [`Globals`] backed by `window`.
///
/// Hands out one [`JsInjected`] per provider object, so every connect
/// against the same extension shares its listener bookkeeping.
#[derive(Default)]
pub struct BrowserGlobals {
    providers: RefCell<Vec<(String, Rc<JsInjected>)>>,
}

impl BrowserGlobals {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Globals for BrowserGlobals {
    fn is_defined(&self, key: &str) -> bool {
        dom::global_object(key).is_some()
    }

    fn flag(&self, key: &str, flag: &str) -> bool {
        dom::global_object(key).is_some_and(|object| dom::bool_property(&object, flag))
    }

    fn injected(&self, key: &str) -> Option<Rc<dyn InjectedProvider>> {
        let object = dom::global_object(key)?;
        let mut providers = self.providers.borrow_mut();
        // An extension that reinjects replaces the object; drop the stale wrapper.
        providers.retain(|(k, p)| k != key || Object::is(p.object(), &object));
        let provider = match providers.iter().find(|(k, _)| k == key) {
            Some((_, provider)) => Rc::clone(provider),
            None => {
                let provider = Rc::new(JsInjected::new(object));
                providers.push((key.to_string(), Rc::clone(&provider)));
                provider
            }
        };
        Some(provider as Rc<dyn InjectedProvider>)
    }
}
