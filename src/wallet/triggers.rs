//! DOM events that prompt a fresh installation probe.
//!
//! Extensions inject late, often after the tab was hidden or unfocused, so
//! focus, visibility and an explicit `wallet-installed` event all re-run
//! detection on top of the session's own bounded poll.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;
use web_sys::EventTarget;

use walletkit_core::WalletSession;

use crate::config::{EVENT_NAMESPACE, FOCUS_EVENT, VISIBILITY_EVENT, WALLET_INSTALLED_EVENT};
use crate::utils::dom;

struct Registration {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn Fn()>,
}

/// Event listeners refreshing the session's `installed` flags.
///
/// Removed again when dropped.
pub struct InstallTriggers {
    registrations: Vec<Registration>,
}

impl InstallTriggers {
    pub fn attach(session: &WalletSession) -> Self {
        let mut registrations = Vec::new();
        let window = dom::window().map(|w| w.unchecked_into::<EventTarget>());
        let document = dom::document().map(|d| d.unchecked_into::<EventTarget>());

        let targets = [
            (window.clone(), FOCUS_EVENT, false),
            (window, WALLET_INSTALLED_EVENT, false),
            (document, VISIBILITY_EVENT, true),
        ];
        for (target, event, only_when_visible) in targets {
            let Some(target) = target else {
                continue;
            };
            let session = session.clone();
            let closure = Closure::wrap(Box::new(move || {
                if only_when_visible && !dom::is_visible() {
                    return;
                }
                session.refresh_installed();
            }) as Box<dyn Fn()>);

            if target
                .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
                .is_err()
            {
                log::warn!(target: EVENT_NAMESPACE, "could not listen for {event}");
                continue;
            }
            registrations.push(Registration {
                target,
                event,
                closure,
            });
        }

        Self { registrations }
    }
}

impl Drop for InstallTriggers {
    fn drop(&mut self) {
        for registration in self.registrations.drain(..) {
            let _ = registration.target.remove_event_listener_with_callback(
                registration.event,
                registration.closure.as_ref().unchecked_ref(),
            );
        }
    }
}
