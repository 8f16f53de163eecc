//! Wallet session state machine.
//!
//! [`WalletSession`] owns the application's single [`SessionState`] and is
//! the only thing that writes it. Transitions:
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!                     |             |
//!                     v             v
//!                   Error  <--------+   (disconnect() resets to Disconnected)
//! ```
//!
//! # Ordering
//!
//! Everything runs on one thread; state changes land in the order their
//! wallet calls resolve. Every connect and disconnect bumps a generation
//! counter. A connect that resolves after a newer connect/disconnect, a
//! switch that resolves after the session moved on, and events published
//! by a replaced provider handle are all dropped by comparing generations.

mod balance;
mod negotiator;

pub use balance::{BalanceUpdate, format_balance, refresh};
pub use negotiator::negotiate;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use futures::future::{LocalBoxFuture, Shared};
use futures::{FutureExt, StreamExt};

use crate::config::{DEFAULT_DECIMALS, EVENT_NAMESPACE, WalletConfig};
use crate::connectors::RegisteredWallet;
use crate::detector::{self, InstallWatcher};
use crate::error::WalletError;
use crate::events::{Envelope, EventBus, WalletEvent};
use crate::models::{ChainDescriptor, SessionState, SessionStatus, WalletDescriptor};
use crate::provider::ProviderHandle;
use crate::runtime::Scheduler;
use crate::storage::SessionStore;

/// Identifier returned by [`WalletSession::watch`].
pub type WatchId = u64;

/// Everything the presentation layer renders from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub session: SessionState,
    pub wallets: Vec<WalletDescriptor>,
    pub selection_open: bool,
}

type SwitchTask = Shared<LocalBoxFuture<'static, Result<(), WalletError>>>;

struct PendingSwitch {
    chain_id: u64,
    generation: u64,
    task: SwitchTask,
}

/// The connected wallet's handle, owned exclusively by the session.
struct Active {
    wallet_id: String,
    provider: Rc<dyn ProviderHandle>,
    generation: u64,
}

struct BalanceTarget {
    provider: Rc<dyn ProviderHandle>,
    address: String,
    generation: u64,
    chain_id: Option<u64>,
    decimals: u8,
}

struct Inner {
    config: WalletConfig,
    wallets: RefCell<Vec<RegisteredWallet>>,
    state: RefCell<SessionState>,
    active: RefCell<Option<Active>>,
    generation: Cell<u64>,
    balance_known: Cell<bool>,
    pending_switch: RefCell<Option<PendingSwitch>>,
    selection_open: Cell<bool>,
    bus: EventBus,
    store: Rc<dyn SessionStore>,
    scheduler: Rc<dyn Scheduler>,
    observers: RefCell<Vec<(WatchId, Rc<dyn Fn(&Snapshot)>)>>,
    next_watch: Cell<WatchId>,
    watcher: RefCell<Option<InstallWatcher>>,
}

impl Inner {
    fn bump_generation(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }
}

/// Handle to the wallet session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WalletSession {
    inner: Rc<Inner>,
}

impl WalletSession {
    /// Create a disconnected session and start consuming wallet events.
    pub fn new(
        config: WalletConfig,
        wallets: Vec<RegisteredWallet>,
        store: Rc<dyn SessionStore>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let inner = Rc::new(Inner {
            config,
            wallets: RefCell::new(wallets),
            state: RefCell::new(SessionState::default()),
            active: RefCell::new(None),
            generation: Cell::new(0),
            balance_known: Cell::new(false),
            pending_switch: RefCell::new(None),
            selection_open: Cell::new(false),
            bus: EventBus::new(),
            store,
            scheduler,
            observers: RefCell::new(Vec::new()),
            next_watch: Cell::new(0),
            watcher: RefCell::new(None),
        });
        let session = Self { inner };
        session.spawn_event_pump();
        session
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Detect installed wallets and, if enabled, reconnect the last wallet.
    ///
    /// Reconnection runs in the background; this returns immediately.
    pub fn mount(&self) {
        self.refresh_installed();
        self.watch_for_install();
        self.auto_reconnect();
    }

    /// Stop background installation polling.
    pub fn unmount(&self) {
        if let Some(watcher) = self.inner.watcher.borrow_mut().take() {
            watcher.cancel();
        }
    }

    /// Recompute the `installed` flag of every registered wallet.
    pub fn refresh_installed(&self) {
        let refreshed = detector::refresh_all(&self.inner.wallets.borrow());
        let changed = self
            .inner
            .wallets
            .borrow()
            .iter()
            .zip(&refreshed)
            .any(|(old, new)| old.descriptor.installed() != new.descriptor.installed());
        *self.inner.wallets.borrow_mut() = refreshed;
        if changed {
            self.notify();
        }
    }

    fn watch_for_install(&self) {
        if self.has_any_installed() {
            return;
        }
        let probe = Rc::downgrade(&self.inner);
        let refresh = Rc::downgrade(&self.inner);
        let watcher = InstallWatcher::start(
            &self.inner.scheduler,
            self.inner.config.install_poll(),
            move || {
                probe.upgrade().is_some_and(|inner| {
                    inner
                        .wallets
                        .borrow()
                        .iter()
                        .any(|wallet| wallet.connector.is_installed())
                })
            },
            move || {
                if let Some(inner) = refresh.upgrade() {
                    WalletSession { inner }.refresh_installed();
                }
            },
        );
        *self.inner.watcher.borrow_mut() = Some(watcher);
    }

    fn auto_reconnect(&self) {
        if !self.inner.config.auto_connect() {
            return;
        }
        let Some(wallet_id) = self.inner.store.load() else {
            return;
        };
        let installed = self
            .inner
            .wallets
            .borrow()
            .iter()
            .any(|wallet| wallet.id() == wallet_id && wallet.descriptor.installed());
        if !installed {
            log::debug!(target: EVENT_NAMESPACE, "skipping auto-connect, {wallet_id} is not installed");
            return;
        }

        let session = self.clone();
        self.inner.scheduler.spawn(
            async move {
                if let Err(err) = session.connect(&wallet_id).await {
                    log::warn!(target: EVENT_NAMESPACE, "auto-connect to {wallet_id} failed: {err}");
                    if session.inner.state.borrow().status() == SessionStatus::Error {
                        session.inner.state.borrow_mut().reset();
                        session.notify();
                    }
                }
            }
            .boxed_local(),
        );
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Connect the registered wallet `wallet_id`.
    ///
    /// Lookup failures and a connect already in flight are rejected without
    /// touching the session. Handshake failures move it to `Error`.
    pub async fn connect(&self, wallet_id: &str) -> Result<(), WalletError> {
        let inner = &self.inner;
        let connector = {
            let wallets = inner.wallets.borrow();
            let wallet = wallets
                .iter()
                .find(|wallet| wallet.id() == wallet_id)
                .ok_or_else(|| WalletError::WalletNotFound(wallet_id.to_string()))?;
            if !wallet.descriptor.installed() {
                return Err(WalletError::WalletNotInstalled(
                    wallet.descriptor.display_name.clone(),
                ));
            }
            Rc::clone(&wallet.connector)
        };
        if inner.state.borrow().is_connecting() {
            return Err(WalletError::AlreadyConnecting);
        }

        if let Some(previous) = inner.active.borrow_mut().take() {
            previous.provider.unsubscribe();
        }
        inner.pending_switch.borrow_mut().take();
        let generation = inner.bump_generation();
        inner.balance_known.set(false);
        inner.state.borrow_mut().begin_connect();
        self.notify();

        log::debug!(target: EVENT_NAMESPACE, "connecting {wallet_id} (generation {generation})");
        let result = connector.connect(inner.bus.sink(generation)).await;

        if inner.generation.get() != generation {
            if let Ok(connection) = &result {
                connection.provider.unsubscribe();
            }
            log::info!(target: EVENT_NAMESPACE, "discarding stale connect to {wallet_id}");
            return Err(WalletError::Superseded);
        }

        match result {
            Ok(connection) => {
                inner
                    .state
                    .borrow_mut()
                    .establish(connection.address, connection.chain_id, wallet_id);
                *inner.active.borrow_mut() = Some(Active {
                    wallet_id: wallet_id.to_string(),
                    provider: connection.provider,
                    generation,
                });
                inner.store.save(wallet_id);
                inner.selection_open.set(false);
                self.notify();
                self.refresh_balance().await;
                Ok(())
            }
            Err(err) => {
                log::warn!(target: EVENT_NAMESPACE, "connect to {wallet_id} failed: {err}");
                inner.state.borrow_mut().fail(err.clone());
                self.notify();
                Err(err)
            }
        }
    }

    /// Drop the connection and forget the saved wallet.
    ///
    /// Never fails: provider-side disconnect errors are only logged.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        inner.bump_generation();
        let active = inner.active.borrow_mut().take();
        if let Some(active) = &active {
            active.provider.unsubscribe();
        }
        inner.pending_switch.borrow_mut().take();
        inner.balance_known.set(false);

        let changed = *inner.state.borrow() != SessionState::default();
        inner.state.borrow_mut().reset();
        inner.store.clear();
        if changed {
            self.notify();
        }

        if let Some(active) = active {
            if let Err(err) = active.provider.disconnect().await {
                log::warn!(target: EVENT_NAMESPACE, "{} disconnect failed: {err}", active.wallet_id);
            }
            log::info!(target: EVENT_NAMESPACE, "disconnected {}", active.wallet_id);
        }
    }

    /// Move the connected wallet to `chain_id`.
    ///
    /// Concurrent calls for the same chain share one negotiation; a call for
    /// another chain while one is in flight fails with `SwitchInProgress`.
    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let task = match self.prepare_switch(chain_id) {
            Ok(Some(task)) => task,
            Ok(None) => return Ok(()),
            Err(err) => {
                if !matches!(err, WalletError::SwitchInProgress(_)) {
                    self.inner.state.borrow_mut().record_error(err.clone());
                    self.notify();
                }
                return Err(err);
            }
        };
        task.await
    }

    fn prepare_switch(&self, chain_id: u64) -> Result<Option<SwitchTask>, WalletError> {
        let inner = &self.inner;
        let (provider, generation) = {
            let active = inner.active.borrow();
            let active = active.as_ref().ok_or(WalletError::NotConnected)?;
            (Rc::clone(&active.provider), active.generation)
        };
        let chain = inner
            .config
            .chains()
            .get(chain_id)
            .cloned()
            .ok_or(WalletError::UnsupportedChain(chain_id))?;
        if inner.state.borrow().chain_id() == Some(chain_id) {
            return Ok(None);
        }

        let mut pending = inner.pending_switch.borrow_mut();
        if let Some(current) = pending.as_ref().filter(|p| p.generation == generation) {
            if current.chain_id == chain_id {
                return Ok(Some(current.task.clone()));
            }
            return Err(WalletError::SwitchInProgress(current.chain_id));
        }

        let weak = Rc::downgrade(&self.inner);
        let task = async move {
            let result = negotiator::negotiate(provider.as_ref(), &chain).await;
            match weak.upgrade() {
                Some(inner) => WalletSession { inner }.finish_switch(generation, chain.id, result),
                None => result,
            }
        }
        .boxed_local()
        .shared();

        *pending = Some(PendingSwitch {
            chain_id,
            generation,
            task: task.clone(),
        });
        Ok(Some(task))
    }

    fn finish_switch(
        &self,
        generation: u64,
        chain_id: u64,
        result: Result<(), WalletError>,
    ) -> Result<(), WalletError> {
        {
            let mut pending = self.inner.pending_switch.borrow_mut();
            if pending
                .as_ref()
                .is_some_and(|p| p.generation == generation && p.chain_id == chain_id)
            {
                *pending = None;
            }
        }

        if self.inner.generation.get() != generation {
            log::debug!(target: EVENT_NAMESPACE, "discarding switch to {chain_id} for a replaced session");
            return result.and(Err(WalletError::Superseded));
        }

        match result {
            Ok(()) => {
                log::info!(target: EVENT_NAMESPACE, "switched to chain {chain_id}");
                self.inner.state.borrow_mut().set_chain(chain_id);
                self.notify();
                self.schedule_balance_refresh(Some(self.inner.config.settle_delay()));
                Ok(())
            }
            Err(err) => {
                log::warn!(target: EVENT_NAMESPACE, "switch to chain {chain_id} failed: {err}");
                self.inner.state.borrow_mut().record_error(err.clone());
                self.notify();
                Err(err)
            }
        }
    }

    /// Current native balance.
    ///
    /// Returns the last refreshed value when there is one, otherwise
    /// refreshes first. `"0"` when disconnected or when the fetch fails.
    pub async fn get_balance(&self) -> String {
        if self.inner.active.borrow().is_none() {
            return "0".to_string();
        }
        if !self.inner.balance_known.get() {
            self.refresh_balance().await;
        }
        self.inner.state.borrow().balance().to_string()
    }

    pub fn open_selection(&self) {
        if !self.inner.selection_open.replace(true) {
            self.notify();
        }
    }

    pub fn close_selection(&self) {
        if self.inner.selection_open.replace(false) {
            self.notify();
        }
    }

    // ========================================================================
    // Read Access
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn wallets(&self) -> Vec<WalletDescriptor> {
        self.inner
            .wallets
            .borrow()
            .iter()
            .map(|wallet| wallet.descriptor.clone())
            .collect()
    }

    pub fn installed_wallet_ids(&self) -> Vec<String> {
        self.inner
            .wallets
            .borrow()
            .iter()
            .filter(|wallet| wallet.descriptor.installed())
            .map(|wallet| wallet.id().to_string())
            .collect()
    }

    pub fn has_any_installed(&self) -> bool {
        self.inner
            .wallets
            .borrow()
            .iter()
            .any(|wallet| wallet.descriptor.installed())
    }

    pub fn chains(&self) -> Vec<ChainDescriptor> {
        self.inner.config.chains().iter().cloned().collect()
    }

    pub fn chain(&self, chain_id: u64) -> Option<ChainDescriptor> {
        self.inner.config.chains().get(chain_id).cloned()
    }

    pub fn is_selection_open(&self) -> bool {
        self.inner.selection_open.get()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            session: self.state(),
            wallets: self.wallets(),
            selection_open: self.is_selection_open(),
        }
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Call `observer` with a fresh snapshot after every transition.
    pub fn watch(&self, observer: impl Fn(&Snapshot) + 'static) -> WatchId {
        let id = self.inner.next_watch.get();
        self.inner.next_watch.set(id + 1);
        self.inner.observers.borrow_mut().push((id, Rc::new(observer)));
        id
    }

    pub fn unwatch(&self, id: WatchId) {
        self.inner.observers.borrow_mut().retain(|(watch, _)| *watch != id);
    }

    fn notify(&self) {
        let observers: Vec<_> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        if observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in observers {
            observer(&snapshot);
        }
    }

    // ========================================================================
    // Balance
    // ========================================================================

    fn balance_target(&self) -> Option<BalanceTarget> {
        let active = self.inner.active.borrow();
        let active = active.as_ref()?;
        let state = self.inner.state.borrow();
        let chain_id = state.chain_id();
        let decimals = chain_id
            .and_then(|id| self.inner.config.chains().get(id))
            .map_or(DEFAULT_DECIMALS, |chain| chain.native_currency.decimals);
        Some(BalanceTarget {
            provider: Rc::clone(&active.provider),
            address: state.address()?.to_string(),
            generation: active.generation,
            chain_id,
            decimals,
        })
    }

    async fn refresh_balance(&self) {
        let Some(target) = self.balance_target() else {
            return;
        };
        let update = refresh(target.provider.as_ref(), &target.address, target.decimals).await;

        let stale = {
            let state = self.inner.state.borrow();
            self.inner.generation.get() != target.generation
                || state.address() != Some(target.address.as_str())
                || state.chain_id() != target.chain_id
        };
        if stale {
            log::debug!(target: EVENT_NAMESPACE, "discarding balance of {}", target.address);
            return;
        }
        if let BalanceUpdate::Set(balance) = update {
            self.inner.state.borrow_mut().set_balance(balance);
            self.inner.balance_known.set(true);
            self.notify();
        }
    }

    fn schedule_balance_refresh(&self, delay: Option<Duration>) {
        let weak = Rc::downgrade(&self.inner);
        let settle = delay.map(|delay| self.inner.scheduler.sleep(delay));
        self.inner.scheduler.spawn(
            async move {
                if let Some(settle) = settle {
                    settle.await;
                }
                if let Some(inner) = weak.upgrade() {
                    WalletSession { inner }.refresh_balance().await;
                }
            }
            .boxed_local(),
        );
    }

    // ========================================================================
    // Wallet Events
    // ========================================================================

    fn spawn_event_pump(&self) {
        let Some(mut events) = self.inner.bus.take_receiver() else {
            return;
        };
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.spawn(
            async move {
                while let Some(envelope) = events.next().await {
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    WalletSession { inner }.handle_event(envelope).await;
                }
            }
            .boxed_local(),
        );
    }

    async fn handle_event(&self, envelope: Envelope) {
        let current = self.inner.active.borrow().as_ref().map(|a| a.generation);
        if current != Some(envelope.generation) {
            log::debug!(target: EVENT_NAMESPACE, "dropping {:?} from a replaced connection", envelope.event);
            return;
        }

        match envelope.event {
            WalletEvent::AccountsChanged { accounts } => match accounts.into_iter().next() {
                Some(address) => {
                    if self.inner.state.borrow().address() == Some(address.as_str()) {
                        return;
                    }
                    log::info!(target: EVENT_NAMESPACE, "account changed to {address}");
                    self.inner.state.borrow_mut().set_address(address);
                    self.inner.balance_known.set(false);
                    self.notify();
                    self.schedule_balance_refresh(None);
                }
                None => {
                    log::info!(target: EVENT_NAMESPACE, "wallet exposes no accounts, disconnecting");
                    self.disconnect().await;
                }
            },
            WalletEvent::ChainChanged { chain_id } => {
                if self.inner.state.borrow().chain_id() == Some(chain_id) {
                    return;
                }
                log::info!(target: EVENT_NAMESPACE, "wallet moved to chain {chain_id}");
                self.inner.state.borrow_mut().set_chain(chain_id);
                self.notify();
                self.schedule_balance_refresh(Some(self.inner.config.settle_delay()));
            }
            WalletEvent::Disconnected { reason } => {
                log::info!(
                    target: EVENT_NAMESPACE,
                    "wallet disconnected: {}",
                    reason.as_deref().unwrap_or("no reason given")
                );
                self.disconnect().await;
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.provider.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::presets;
    use crate::testing::{Harness, TEST_ADDRESS, settle, test_config};
    use serde_json::json;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_connect_unknown_wallet() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                let err = h.session.connect("phantom").await.unwrap_err();
                assert_eq!(err, WalletError::WalletNotFound("phantom".into()));
                assert_eq!(h.session.state(), SessionState::default());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_connect_success_persists_and_closes_selection() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.open_selection();
                h.session.connect("metamask").await.unwrap();

                let state = h.session.state();
                assert_eq!(state.status(), SessionStatus::Connected);
                assert_eq!(state.address(), Some(TEST_ADDRESS));
                assert_eq!(state.chain_id(), Some(1));
                assert_eq!(state.balance(), "1.5");
                assert_eq!(state.active_wallet_id(), Some("metamask"));
                assert_eq!(h.store.load().as_deref(), Some("metamask"));
                assert!(!h.session.is_selection_open());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_connect_failure_sets_error() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.injected.fail("eth_requestAccounts", 4001, "User rejected the request.");

                let err = h.session.connect("metamask").await.unwrap_err();
                let state = h.session.state();
                assert_eq!(state.status(), SessionStatus::Error);
                assert_eq!(state.last_error(), Some(&err));
                assert_eq!(state.address(), None);
                assert_eq!(h.store.load(), None);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_connect_while_connecting_rejected() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                let gate = h.injected.hold("eth_requestAccounts");

                let first = tokio::task::spawn_local({
                    let session = h.session.clone();
                    async move { session.connect("metamask").await }
                });
                settle().await;
                assert!(h.session.state().is_connecting());

                let err = h.session.connect("metamask").await.unwrap_err();
                assert_eq!(err, WalletError::AlreadyConnecting);

                gate.send(()).unwrap();
                first.await.unwrap().unwrap();
                assert_eq!(h.injected.calls_to("eth_requestAccounts"), 1);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_disconnect_is_idempotent() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                let notified = Rc::new(Cell::new(0));
                let counter = Rc::clone(&notified);
                h.session.watch(move |_| counter.set(counter.get() + 1));

                h.session.disconnect().await;
                h.session.disconnect().await;
                assert_eq!(h.session.state(), SessionState::default());
                assert_eq!(notified.get(), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_disconnect_resets_and_detaches() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();
                h.session.disconnect().await;

                assert_eq!(h.session.state(), SessionState::default());
                assert_eq!(h.store.load(), None);
                assert_eq!(h.injected.listener_count("accountsChanged"), 0);
                assert_eq!(h.injected.listener_count("chainChanged"), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_switch_requires_connection() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                let err = h.session.switch_chain(137).await.unwrap_err();
                assert_eq!(err, WalletError::NotConnected);
                assert_eq!(h.session.state().last_error(), Some(&WalletError::NotConnected));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_switch_unsupported_chain() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();

                let err = h.session.switch_chain(10).await.unwrap_err();
                assert_eq!(err, WalletError::UnsupportedChain(10));
                assert_eq!(h.session.state().chain_id(), Some(1));
                assert_eq!(h.injected.calls_to("wallet_switchEthereumChain"), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_switch_to_current_chain_is_noop() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();

                h.session.switch_chain(1).await.unwrap();
                assert_eq!(h.injected.calls_to("wallet_switchEthereumChain"), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_concurrent_switch_shares_negotiation() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();
                let gate = h.injected.hold("wallet_switchEthereumChain");

                let first = tokio::task::spawn_local({
                    let session = h.session.clone();
                    async move { session.switch_chain(137).await }
                });
                let second = tokio::task::spawn_local({
                    let session = h.session.clone();
                    async move { session.switch_chain(137).await }
                });
                settle().await;

                let other = h.session.switch_chain(11155111).await.unwrap_err();
                assert_eq!(other, WalletError::SwitchInProgress(137));

                gate.send(()).unwrap();
                first.await.unwrap().unwrap();
                second.await.unwrap().unwrap();
                assert_eq!(h.injected.calls_to("wallet_switchEthereumChain"), 1);
                assert_eq!(h.session.state().chain_id(), Some(137));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_switch_failure_keeps_chain() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();
                h.injected.fail("wallet_switchEthereumChain", 4001, "User rejected the request.");

                let err = h.session.switch_chain(137).await.unwrap_err();
                assert_eq!(
                    err,
                    WalletError::ChainSwitchFailed("User rejected the request.".into())
                );
                let state = h.session.state();
                assert_eq!(state.chain_id(), Some(1));
                assert!(state.is_connected());
                assert_eq!(state.last_error(), Some(&err));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_switch_refreshes_balance_after_settle() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();
                let before = h.injected.calls_to("eth_getBalance");

                h.session.switch_chain(137).await.unwrap();
                settle().await;
                assert_eq!(h.injected.calls_to("eth_getBalance"), before);

                tokio::time::sleep(Duration::from_millis(1100)).await;
                assert_eq!(h.injected.calls_to("eth_getBalance"), before + 1);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_balance_for_previous_chain_is_discarded() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();
                assert_eq!(h.session.state().balance(), "1.5");

                let gate = h.injected.hold("eth_getBalance");
                h.injected
                    .set_balance(alloy_primitives::U256::from(2_000_000_000_000_000_000u128));
                h.injected.emit("chainChanged", json!("0x89"));
                settle().await;
                tokio::time::sleep(Duration::from_millis(1100)).await;
                let parked = h.injected.calls_to("eth_getBalance");

                // The wallet moves on while the polygon lookup is parked.
                h.injected.emit("chainChanged", json!("0xaa36a7"));
                settle().await;
                gate.send(()).unwrap();
                settle().await;
                assert_eq!(h.session.state().chain_id(), Some(11155111));
                assert_eq!(h.session.state().balance(), "1.5");

                tokio::time::sleep(Duration::from_millis(1100)).await;
                assert_eq!(h.injected.calls_to("eth_getBalance"), parked + 1);
                assert_eq!(h.session.state().balance(), "2.0");
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_get_balance() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                assert_eq!(h.session.get_balance().await, "0");

                h.session.connect("metamask").await.unwrap();
                let calls = h.injected.calls_to("eth_getBalance");
                assert_eq!(h.session.get_balance().await, "1.5");
                assert_eq!(h.injected.calls_to("eth_getBalance"), calls);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_get_balance_failure_returns_zero() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.injected.fail("eth_getBalance", -32000, "header not found");
                h.session.connect("metamask").await.unwrap();

                assert_eq!(h.session.get_balance().await, "0");
                assert!(h.session.state().last_error().is_none());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_accounts_changed_updates_address() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();

                let other = "0x9999000000000000000000000000000000000001";
                h.injected.emit("accountsChanged", json!([other]));
                settle().await;
                assert_eq!(h.session.state().address(), Some(other));
                assert_eq!(h.injected.last_params("eth_getBalance"), Some(json!([other, "latest"])));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_chain_changed_event() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();

                h.injected.emit("chainChanged", json!("0xaa36a7"));
                settle().await;
                assert_eq!(h.session.state().chain_id(), Some(11155111));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_disconnect_event() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                h.session.connect("metamask").await.unwrap();

                h.injected.emit("disconnect", json!({ "code": 4900, "message": "offline" }));
                settle().await;
                assert_eq!(h.session.state(), SessionState::default());
                assert_eq!(h.store.load(), None);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_stale_connect_cannot_resurrect_session() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                let gate = h.injected.hold("eth_requestAccounts");

                let pending = tokio::task::spawn_local({
                    let session = h.session.clone();
                    async move { session.connect("metamask").await }
                });
                settle().await;
                h.session.disconnect().await;

                gate.send(()).unwrap();
                let result = pending.await.unwrap();
                assert_eq!(result, Err(WalletError::Superseded));
                assert_eq!(h.session.state(), SessionState::default());
                assert_eq!(h.store.load(), None);
                assert_eq!(h.injected.listener_count("accountsChanged"), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_watchers_receive_snapshots() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                let seen = Rc::new(RefCell::new(Vec::new()));
                let log = Rc::clone(&seen);
                let id = h.session.watch(move |snapshot| {
                    log.borrow_mut().push(snapshot.session.status());
                });

                h.session.connect("metamask").await.unwrap();
                h.session.unwatch(id);
                h.session.disconnect().await;

                let seen = seen.borrow();
                assert_eq!(seen.first(), Some(&SessionStatus::Connecting));
                assert_eq!(seen.last(), Some(&SessionStatus::Connected));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_chain_lookup() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let h = Harness::metamask(test_config());
                assert_eq!(h.session.chain(137), Some(presets::polygon()));
                assert_eq!(h.session.chains().len(), 3);
            })
            .await;
    }
}
