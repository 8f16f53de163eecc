//! Connector for wallets that inject an EIP-1193 provider into `window`.

use std::cell::RefCell;
use std::rc::Rc;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Connection, Connector};
use crate::config::EVENT_NAMESPACE;
use crate::detector::{self, WalletKind};
use crate::error::{ProviderError, WalletError};
use crate::events::{EventSink, WalletEvent};
use crate::models::parse_chain_id;
use crate::provider::{Globals, InjectedProvider, ListenerId, ProviderHandle};

const ACCOUNTS_CHANGED: &str = "accountsChanged";
const CHAIN_CHANGED: &str = "chainChanged";
const DISCONNECT: &str = "disconnect";

// ============================================================================
// Connector
// ============================================================================

/// Handshake against `window.ethereum` or `window.coinbaseWalletExtension`.
///
/// Every connect yields a fresh handle. The caller owns it and must
/// unsubscribe it when the connection is replaced or discarded.
pub struct InjectedConnector {
    kind: WalletKind,
    globals: Rc<dyn Globals>,
}

impl InjectedConnector {
    pub fn new(kind: WalletKind, globals: Rc<dyn Globals>) -> Self {
        Self { kind, globals }
    }

    fn not_installed(&self) -> WalletError {
        WalletError::NotInstalled(self.kind.display_name().to_string())
    }
}

#[async_trait(?Send)]
impl Connector for InjectedConnector {
    fn is_installed(&self) -> bool {
        detector::probe(self.kind, self.globals.as_ref())
    }

    async fn connect(&self, events: EventSink) -> Result<Connection, WalletError> {
        if !self.is_installed() {
            return Err(self.not_installed());
        }
        let provider = self
            .globals
            .injected(self.kind.global_key())
            .ok_or_else(|| self.not_installed())?;

        let accounts = provider
            .request("eth_requestAccounts", None)
            .await
            .map_err(handshake_error)?;
        let accounts: Vec<String> = serde_json::from_value(accounts)
            .map_err(|_| WalletError::ConnectError("malformed account list".to_string()))?;
        let Some(address) = accounts.first().cloned() else {
            return Err(WalletError::ConnectError("no accounts returned".to_string()));
        };

        let chain = provider
            .request("eth_chainId", None)
            .await
            .map_err(|e| WalletError::ConnectError(e.message))?;
        let chain_id = parse_chain_id(&chain)
            .ok_or_else(|| WalletError::ConnectError(format!("malformed chain id: {chain}")))?;

        let handle = Rc::new(InjectedHandle::new(self.kind, provider));
        handle.subscribe(events);

        log::info!(
            target: EVENT_NAMESPACE,
            "{} connected {address} on chain {chain_id}",
            self.kind.display_name()
        );
        Ok(Connection {
            address,
            chain_id,
            accounts,
            provider: handle,
        })
    }
}

fn handshake_error(err: ProviderError) -> WalletError {
    if err.is_user_rejection() {
        WalletError::UserRejected(err.message)
    } else {
        WalletError::ConnectError(err.message)
    }
}

// ============================================================================
// Provider Handle
// ============================================================================

/// [`ProviderHandle`] over an injected EIP-1193 object.
pub struct InjectedHandle {
    kind: WalletKind,
    provider: Rc<dyn InjectedProvider>,
    listeners: RefCell<Vec<(&'static str, ListenerId)>>,
}

impl InjectedHandle {
    pub fn new(kind: WalletKind, provider: Rc<dyn InjectedProvider>) -> Self {
        Self {
            kind,
            provider,
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Number of native listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

#[async_trait(?Send)]
impl ProviderHandle for InjectedHandle {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ProviderError> {
        self.provider.request(method, params).await
    }

    async fn balance_of(&self, address: &str) -> Result<U256, ProviderError> {
        let value = self
            .provider
            .request("eth_getBalance", Some(json!([address, "latest"])))
            .await?;
        value
            .as_str()
            .and_then(|s| s.strip_prefix("0x"))
            .and_then(|hex| U256::from_str_radix(hex, 16).ok())
            .ok_or_else(|| ProviderError::malformed("balance"))
    }

    fn subscribe(&self, sink: EventSink) {
        self.unsubscribe();

        let accounts_sink = sink.clone();
        let accounts = self.provider.on(
            ACCOUNTS_CHANGED,
            Rc::new(move |value| {
                let accounts = serde_json::from_value::<Vec<String>>(value).unwrap_or_default();
                accounts_sink.publish(WalletEvent::AccountsChanged { accounts });
            }),
        );

        let chain_sink = sink.clone();
        let chain = self.provider.on(
            CHAIN_CHANGED,
            Rc::new(move |value| match parse_chain_id(&value) {
                Some(chain_id) => chain_sink.publish(WalletEvent::ChainChanged { chain_id }),
                None => log::warn!(target: EVENT_NAMESPACE, "ignoring malformed chainChanged payload: {value}"),
            }),
        );

        let disconnect = self.provider.on(
            DISCONNECT,
            Rc::new(move |value| {
                sink.publish(WalletEvent::Disconnected {
                    reason: disconnect_reason(&value),
                });
            }),
        );

        *self.listeners.borrow_mut() = vec![
            (ACCOUNTS_CHANGED, accounts),
            (CHAIN_CHANGED, chain),
            (DISCONNECT, disconnect),
        ];
    }

    fn unsubscribe(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for (event, id) in listeners {
            self.provider.remove_listener(event, id);
        }
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        // Only the Coinbase extension offers a disconnect; it amounts to dropping listeners.
        if self.kind == WalletKind::Coinbase {
            self.unsubscribe();
        }
        Ok(())
    }
}

fn disconnect_reason(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.as_str())
        .map(str::to_string)
}
