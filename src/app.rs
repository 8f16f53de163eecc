//! Reactive wallet context for Leptos applications.
//!
//! [`provide_wallet_context`] builds the browser session, mirrors every
//! snapshot into signals, and provides a [`WalletContext`] that components
//! retrieve with [`use_wallet`].

use leptos::prelude::*;

use walletkit_core::{
    ChainDescriptor, RegisteredWallet, SessionState, Snapshot, WalletConfig, WalletDescriptor,
    WalletError, WalletSession,
};

use crate::config::EVENT_NAMESPACE;
use crate::wallet::{InstallTriggers, browser_session, browser_wallets};

// ============================================================================
// WalletContext
// ============================================================================

/// Wallet session state as signals, plus the session operations.
///
/// `Copy` like every Leptos handle; the session itself lives in local
/// storage of the reactive owner that created the context.
#[derive(Clone, Copy)]
pub struct WalletContext {
    /// Current session snapshot.
    pub state: RwSignal<SessionState>,
    /// Registered wallets with live `installed` flags.
    pub wallets: RwSignal<Vec<WalletDescriptor>>,
    /// Whether the wallet selection view should be shown.
    pub selection_open: RwSignal<bool>,
    session: StoredValue<WalletSession, LocalStorage>,
}

impl WalletContext {
    /// Wrap an existing session and start mirroring its snapshots.
    pub fn new(session: WalletSession) -> Self {
        let snapshot = session.snapshot();
        let ctx = Self {
            state: RwSignal::new(snapshot.session),
            wallets: RwSignal::new(snapshot.wallets),
            selection_open: RwSignal::new(snapshot.selection_open),
            session: StoredValue::new_local(session.clone()),
        };
        session.watch(move |snapshot| ctx.apply(snapshot));
        ctx
    }

    fn apply(&self, snapshot: &Snapshot) {
        // Signals may already be disposed while a wallet call is still settling.
        let _ = self.state.try_set(snapshot.session.clone());
        let _ = self.wallets.try_set(snapshot.wallets.clone());
        let _ = self.selection_open.try_set(snapshot.selection_open);
    }

    pub fn session(&self) -> Option<WalletSession> {
        self.session.try_get_value()
    }

    /// The session, unless the owning scope has already been torn down.
    fn live_session(&self, operation: &str) -> Result<WalletSession, WalletError> {
        self.session().ok_or_else(|| {
            log::warn!(target: EVENT_NAMESPACE, "{operation} called after the wallet context was disposed");
            WalletError::Superseded
        })
    }

    pub async fn connect(&self, wallet_id: &str) -> Result<(), WalletError> {
        self.live_session("connect")?.connect(wallet_id).await
    }

    pub async fn disconnect(&self) {
        if let Some(session) = self.session() {
            session.disconnect().await;
        }
    }

    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.live_session("switch_chain")?
            .switch_chain(chain_id)
            .await
    }

    pub async fn get_balance(&self) -> String {
        match self.session() {
            Some(session) => session.get_balance().await,
            None => "0".to_string(),
        }
    }

    pub fn open_selection(&self) {
        if let Some(session) = self.session() {
            session.open_selection();
        }
    }

    pub fn close_selection(&self) {
        if let Some(session) = self.session() {
            session.close_selection();
        }
    }

    pub fn chains(&self) -> Vec<ChainDescriptor> {
        self.session().map(|s| s.chains()).unwrap_or_default()
    }

    pub fn chain(&self, chain_id: u64) -> Option<ChainDescriptor> {
        self.session()?.chain(chain_id)
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Create the browser session with the built-in wallets and provide it.
///
/// Call once near the root of the component tree.
pub fn provide_wallet_context(config: WalletConfig) -> WalletContext {
    provide_wallet_context_with(config, browser_wallets())
}

/// Like [`provide_wallet_context`] with a custom wallet registry.
pub fn provide_wallet_context_with(
    config: WalletConfig,
    wallets: Vec<RegisteredWallet>,
) -> WalletContext {
    let session = browser_session(config, wallets);
    let ctx = WalletContext::new(session.clone());

    let triggers = StoredValue::new_local(Some(InstallTriggers::attach(&session)));
    session.mount();

    on_cleanup(move || {
        if let Some(session) = ctx.session() {
            session.unmount();
        }
        triggers.try_update_value(|triggers| {
            triggers.take();
        });
    });

    provide_context(ctx);
    ctx
}

/// The [`WalletContext`] provided by an ancestor.
pub fn use_wallet() -> WalletContext {
    expect_context::<WalletContext>()
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use walletkit_core::models::presets;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn disposed_context() -> WalletContext {
        let config = WalletConfig::new(vec![presets::ethereum(), presets::polygon()]).unwrap();
        let ctx = WalletContext::new(browser_session(config, Vec::new()));
        ctx.session.dispose();
        ctx
    }

    #[wasm_bindgen_test]
    async fn test_connect_after_dispose_is_superseded() {
        let ctx = disposed_context();
        assert!(ctx.session().is_none());
        assert_eq!(ctx.connect("metamask").await, Err(WalletError::Superseded));
    }

    #[wasm_bindgen_test]
    async fn test_switch_after_dispose_is_superseded() {
        let ctx = disposed_context();
        assert_eq!(ctx.switch_chain(137).await, Err(WalletError::Superseded));
        assert_eq!(ctx.get_balance().await, "0");
    }
}
