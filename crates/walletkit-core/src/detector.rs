//! Wallet installation detection.
//!
//! Probes are pure reads of the injected globals and never fail: anything
//! unexpected counts as "not installed". [`InstallWatcher`] polls with a
//! bounded backoff while no wallet is present and stops when one shows up,
//! when it runs out of attempts, or when it is dropped.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;

use crate::config::{EVENT_NAMESPACE, install_poll};
use crate::connectors::RegisteredWallet;
use crate::provider::Globals;
use crate::runtime::Scheduler;

// ============================================================================
// Wallet Kinds
// ============================================================================

/// Injected wallets the crate knows how to probe and connect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WalletKind {
    MetaMask,
    Coinbase,
    Trust,
    Brave,
}

impl WalletKind {
    pub const ALL: [WalletKind; 4] = [Self::MetaMask, Self::Coinbase, Self::Trust, Self::Brave];

    /// Stable registry id.
    pub fn id(self) -> &'static str {
        match self {
            Self::MetaMask => "metamask",
            Self::Coinbase => "coinbase",
            Self::Trust => "trust",
            Self::Brave => "brave",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::MetaMask => "MetaMask",
            Self::Coinbase => "Coinbase Wallet",
            Self::Trust => "Trust Wallet",
            Self::Brave => "Brave Wallet",
        }
    }

    /// Window property the extension injects its provider under.
    pub fn global_key(self) -> &'static str {
        match self {
            Self::Coinbase => "coinbaseWalletExtension",
            Self::MetaMask | Self::Trust | Self::Brave => "ethereum",
        }
    }

    /// Provider flag identifying the extension behind `window.ethereum`.
    fn identity_flag(self) -> Option<&'static str> {
        match self {
            Self::MetaMask => Some("isMetaMask"),
            Self::Trust => Some("isTrust"),
            Self::Brave => Some("isBraveWallet"),
            Self::Coinbase => None,
        }
    }

    /// Look up a kind by id, ignoring case.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id))
    }
}

// ============================================================================
// Probes
// ============================================================================

/// Whether the given wallet kind is installed in this environment.
pub fn probe(kind: WalletKind, globals: &dyn Globals) -> bool {
    match kind.identity_flag() {
        Some(flag) => globals.flag(kind.global_key(), flag),
        None => globals.is_defined(kind.global_key()),
    }
}

/// Probe by wallet id. Unknown ids are never installed.
pub fn probe_id(wallet_id: &str, globals: &dyn Globals) -> bool {
    WalletKind::from_id(wallet_id).is_some_and(|kind| probe(kind, globals))
}

/// Ids of every known wallet kind currently installed.
pub fn installed_ids(globals: &dyn Globals) -> Vec<&'static str> {
    WalletKind::ALL
        .into_iter()
        .filter(|kind| probe(*kind, globals))
        .map(WalletKind::id)
        .collect()
}

/// Recompute `installed` for every registered wallet.
///
/// Only the flag changes; ids, metadata and connectors are carried over.
pub fn refresh_all(wallets: &[RegisteredWallet]) -> Vec<RegisteredWallet> {
    wallets
        .iter()
        .map(|wallet| {
            let mut wallet = wallet.clone();
            let installed = wallet.connector.is_installed();
            wallet.descriptor.set_installed(installed);
            wallet
        })
        .collect()
}

// ============================================================================
// Installation Polling
// ============================================================================

/// Bounded exponential backoff for installation polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial: Duration,
    pub factor: u32,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(install_poll::INITIAL_MS),
            factor: install_poll::BACKOFF_FACTOR,
            cap: Duration::from_millis(install_poll::CAP_MS),
            max_attempts: install_poll::MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    /// Delay before each attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let policy = *self;
        (0..policy.max_attempts).scan(policy.initial, move |next, _| {
            let current = (*next).min(policy.cap);
            *next = next.saturating_mul(policy.factor);
            Some(current)
        })
    }
}

/// Background poll that fires `on_found` once `present` turns true.
///
/// Dropping the watcher cancels the poll.
#[derive(Debug)]
pub struct InstallWatcher {
    done: Rc<Cell<bool>>,
}

impl InstallWatcher {
    pub fn start<P, F>(
        scheduler: &Rc<dyn Scheduler>,
        policy: PollPolicy,
        present: P,
        on_found: F,
    ) -> Self
    where
        P: Fn() -> bool + 'static,
        F: FnOnce() + 'static,
    {
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        let timer = Rc::clone(scheduler);

        scheduler.spawn(
            async move {
                for (attempt, delay) in policy.delays().enumerate() {
                    timer.sleep(delay).await;
                    if flag.get() {
                        return;
                    }
                    if present() {
                        log::debug!(target: EVENT_NAMESPACE, "wallet detected after {} polls", attempt + 1);
                        flag.set(true);
                        on_found();
                        return;
                    }
                }
                log::debug!(target: EVENT_NAMESPACE, "installation poll gave up after {} attempts", policy.max_attempts);
                flag.set(true);
            }
            .boxed_local(),
        );

        Self { done }
    }

    pub fn cancel(&self) {
        self.done.set(true);
    }

    /// Whether the poll is still waiting for a wallet.
    pub fn is_running(&self) -> bool {
        !self.done.get()
    }
}

impl Drop for InstallWatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
