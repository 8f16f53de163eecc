//! Capability traits between the session and the browser.
//!
//! - [`InjectedProvider`] - the raw EIP-1193 object a wallet extension injects
//! - [`ProviderHandle`] - what the session holds for the connected wallet
//! - [`Globals`] - read access to injected globals for installation probes

use std::rc::Rc;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::events::EventSink;

/// Identifier returned by [`InjectedProvider::on`] for later removal.
pub type ListenerId = u64;

/// Callback attached to a native provider event.
pub type Listener = Rc<dyn Fn(Value)>;

/// An EIP-1193 provider object (`window.ethereum` and friends).
#[async_trait(?Send)]
pub trait InjectedProvider {
    /// `provider.request({ method, params })`.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ProviderError>;

    /// `provider.on(event, listener)`.
    fn on(&self, event: &str, listener: Listener) -> ListenerId;

    /// `provider.removeListener(event, listener)`.
    fn remove_listener(&self, event: &str, id: ListenerId);
}

/// Connected-wallet capability produced by a connector adapter.
///
/// The session never looks past this trait, whatever wallet is active.
#[async_trait(?Send)]
pub trait ProviderHandle {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ProviderError>;

    /// Native balance of `address` in the smallest unit.
    async fn balance_of(&self, address: &str) -> Result<U256, ProviderError>;

    /// Forward native events to `sink`, replacing any earlier subscription.
    fn subscribe(&self, sink: EventSink);

    /// Detach every native listener. Safe to call repeatedly.
    fn unsubscribe(&self);

    /// Wallet-specific disconnect. Most injected wallets have none.
    async fn disconnect(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Browser-injected globals, as seen by installation probes.
pub trait Globals {
    /// Whether `window[key]` is defined and not null.
    fn is_defined(&self, key: &str) -> bool;

    /// Whether `window[key][flag] === true`.
    fn flag(&self, key: &str, flag: &str) -> bool;

    /// The EIP-1193 object at `window[key]`.
    fn injected(&self, key: &str) -> Option<Rc<dyn InjectedProvider>>;
}
