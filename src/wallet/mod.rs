//! Browser implementations of the core capability traits.
//!
//! - [`BrowserGlobals`] - probes and provider objects on `window`
//! - [`JsInjected`] - an EIP-1193 object driven through `js-sys`
//! - [`LocalSessionStore`] - last wallet id in `localStorage`
//! - [`BrowserScheduler`] - `spawn_local` plus `setTimeout` sleeps
//! - [`InstallTriggers`] - focus/visibility/`wallet-installed` re-detection

mod globals;
mod injected;
mod scheduler;
mod storage;
mod triggers;

use std::rc::Rc;

use walletkit_core::provider::Globals;
use walletkit_core::{RegisteredWallet, WalletConfig, WalletSession, default_wallets};

pub use globals::BrowserGlobals;
pub use injected::JsInjected;
pub use scheduler::BrowserScheduler;
pub use storage::LocalSessionStore;
pub use triggers::InstallTriggers;

/// The built-in wallets, probed against this page.
pub fn browser_wallets() -> Vec<RegisteredWallet> {
    let globals: Rc<dyn Globals> = Rc::new(BrowserGlobals::new());
    default_wallets(globals)
}

/// A session over the real browser environment.
pub fn browser_session(config: WalletConfig, wallets: Vec<RegisteredWallet>) -> WalletSession {
    WalletSession::new(
        config,
        wallets,
        Rc::new(LocalSessionStore),
        Rc::new(BrowserScheduler),
    )
}
