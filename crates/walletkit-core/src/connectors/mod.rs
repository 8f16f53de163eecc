//! Connector adapters.
//!
//! A [`Connector`] performs the account handshake for one wallet kind and
//! hands back a [`Connection`] whose [`ProviderHandle`] already forwards the
//! wallet's native events to the session's bus.

mod injected;

use std::rc::Rc;

use async_trait::async_trait;

use crate::detector::WalletKind;
use crate::error::WalletError;
use crate::events::EventSink;
use crate::models::WalletDescriptor;
use crate::provider::{Globals, ProviderHandle};

pub use injected::{InjectedConnector, InjectedHandle};

/// Result of a successful handshake.
#[derive(Clone)]
pub struct Connection {
    /// First authorized account.
    pub address: String,
    /// Chain reported by the wallet's network query at connect time.
    pub chain_id: u64,
    pub accounts: Vec<String>,
    pub provider: Rc<dyn ProviderHandle>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

/// Handshake capability of a registered wallet.
#[async_trait(?Send)]
pub trait Connector {
    /// Installation probe for this wallet.
    fn is_installed(&self) -> bool;

    /// Request accounts and subscribe the returned handle to `events`.
    async fn connect(&self, events: EventSink) -> Result<Connection, WalletError>;
}

/// A wallet as known to the session: display metadata plus its connector.
#[derive(Clone)]
pub struct RegisteredWallet {
    pub descriptor: WalletDescriptor,
    pub connector: Rc<dyn Connector>,
}

impl RegisteredWallet {
    /// Register a wallet, probing its installation state once.
    pub fn new(descriptor: WalletDescriptor, connector: Rc<dyn Connector>) -> Self {
        let mut descriptor = descriptor;
        descriptor.set_installed(connector.is_installed());
        Self {
            descriptor,
            connector,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

impl std::fmt::Debug for RegisteredWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredWallet")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Registry entry for an injected wallet kind.
pub fn injected_wallet(kind: WalletKind, globals: Rc<dyn Globals>) -> RegisteredWallet {
    let descriptor = match kind {
        WalletKind::MetaMask => WalletDescriptor::new(
            kind.id(),
            kind.display_name(),
            "https://assets.coingecko.com/coins/images/13864/large/MetaMask_2019.png",
        )
        .with_description("MetaMask wallet")
        .with_download_url("https://metamask.io/download/"),
        WalletKind::Coinbase => WalletDescriptor::new(
            kind.id(),
            kind.display_name(),
            "https://assets.coinbase.com/assets/coinbase-wallet-icon-16x16.png",
        )
        .with_description("Self-custody wallet by Coinbase")
        .with_download_url("https://wallet.coinbase.com/"),
        WalletKind::Trust => WalletDescriptor::new(
            kind.id(),
            kind.display_name(),
            "https://trustwallet.com/assets/images/favicon.png",
        )
        .with_download_url("https://trustwallet.com/download"),
        WalletKind::Brave => WalletDescriptor::new(
            kind.id(),
            kind.display_name(),
            "https://brave.com/static-assets/images/brave-favicon.png",
        )
        .with_download_url("https://brave.com/wallet/"),
    };
    RegisteredWallet::new(descriptor, Rc::new(InjectedConnector::new(kind, globals)))
}

pub fn metamask(globals: Rc<dyn Globals>) -> RegisteredWallet {
    injected_wallet(WalletKind::MetaMask, globals)
}

pub fn coinbase(globals: Rc<dyn Globals>) -> RegisteredWallet {
    injected_wallet(WalletKind::Coinbase, globals)
}

/// Every built-in wallet, in display order.
pub fn default_wallets(globals: Rc<dyn Globals>) -> Vec<RegisteredWallet> {
    WalletKind::ALL
        .into_iter()
        .map(|kind| injected_wallet(kind, Rc::clone(&globals)))
        .collect()
}
