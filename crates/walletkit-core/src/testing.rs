//! Scriptable stand-ins for the browser, for tests and headless hosts.
//!
//! [`MockInjected`] plays an EIP-1193 provider, [`MockGlobals`] plays
//! `window`, and [`TokioScheduler`] runs session tasks on a tokio
//! `LocalSet`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use serde_json::{Value, json};

use crate::config::WalletConfig;
use crate::connectors::{self, RegisteredWallet};
use crate::error::ProviderError;
use crate::models::{chain_id_hex, presets};
use crate::provider::{Globals, InjectedProvider, Listener, ListenerId};
use crate::runtime::Scheduler;
use crate::session::WalletSession;
use crate::storage::{MemoryStore, SessionStore};

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

type Response = Result<Value, ProviderError>;

// ============================================================================
// Injected Provider
// ============================================================================

/// Scripted EIP-1193 provider.
///
/// Every method answers from a standing response unless a one-shot response
/// is queued for it. [`MockInjected::hold`] parks the next call to a method
/// until the returned sender fires.
pub struct MockInjected {
    responses: RefCell<HashMap<String, Response>>,
    queued: RefCell<HashMap<String, VecDeque<Response>>>,
    calls: RefCell<Vec<(String, Option<Value>)>>,
    listeners: RefCell<Vec<(String, ListenerId, Listener)>>,
    next_listener: Cell<ListenerId>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
}

impl MockInjected {
    /// A wallet with no accounts on chain 1 and a zero balance.
    pub fn new() -> Self {
        let responses = HashMap::from([
            ("eth_requestAccounts".to_string(), Ok(json!([]))),
            ("eth_accounts".to_string(), Ok(json!([]))),
            ("eth_chainId".to_string(), Ok(json!("0x1"))),
            ("eth_getBalance".to_string(), Ok(json!("0x0"))),
            ("wallet_switchEthereumChain".to_string(), Ok(Value::Null)),
            ("wallet_addEthereumChain".to_string(), Ok(Value::Null)),
        ]);
        Self {
            responses: RefCell::new(responses),
            queued: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
            gates: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_accounts(self, accounts: &[&str]) -> Self {
        self.respond("eth_requestAccounts", Ok(json!(accounts)));
        self.respond("eth_accounts", Ok(json!(accounts)));
        self
    }

    pub fn with_chain(self, chain_id: u64) -> Self {
        self.respond("eth_chainId", Ok(json!(chain_id_hex(chain_id))));
        self
    }

    /// Standing response for `method`.
    pub fn respond(&self, method: &str, response: Response) {
        self.responses
            .borrow_mut()
            .insert(method.to_string(), response);
    }

    /// Response for the next call to `method` only.
    pub fn respond_once(&self, method: &str, response: Response) {
        self.queued
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Make every call to `method` fail.
    pub fn fail(&self, method: &str, code: i64, message: &str) {
        self.respond(method, Err(ProviderError::new(code, message)));
    }

    pub fn set_balance(&self, wei: U256) {
        self.respond("eth_getBalance", Ok(json!(format!("0x{wei:x}"))));
    }

    /// Park the next call to `method` until the returned sender fires.
    pub fn hold(&self, method: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(method.to_string(), rx);
        tx
    }

    /// Fire a native event at every listener attached for it.
    pub fn emit(&self, event: &str, payload: Value) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _, _)| name == event)
            .map(|(_, _, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(payload.clone());
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(name, _, _)| name == event)
            .count()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(name, _)| name == method)
            .count()
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|(name, _)| name == method)
            .and_then(|(_, params)| params.clone())
    }

    fn next_response(&self, method: &str) -> Response {
        if let Some(response) = self
            .queued
            .borrow_mut()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        self.responses
            .borrow()
            .get(method)
            .cloned()
            .unwrap_or_else(|| {
                Err(ProviderError::new(
                    METHOD_NOT_FOUND,
                    format!("method {method} not supported"),
                ))
            })
    }
}

impl Default for MockInjected {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl InjectedProvider for MockInjected {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ProviderError> {
        self.calls.borrow_mut().push((method.to_string(), params));
        let gate = self.gates.borrow_mut().remove(method);
        if let Some(gate) = gate {
            // A dropped sender releases the call too.
            let _ = gate.await;
        }
        self.next_response(method)
    }

    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners
            .borrow_mut()
            .push((event.to_string(), id, listener));
        id
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(name, listener, _)| !(name == event && *listener == id));
    }
}

// ============================================================================
// Globals
// ============================================================================

struct Installed {
    provider: Rc<MockInjected>,
    flags: Vec<String>,
}

/// In-memory `window` with installable providers.
#[derive(Default)]
pub struct MockGlobals {
    installed: RefCell<HashMap<String, Installed>>,
}

impl MockGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `provider` at `window[key]` with the given boolean flags set.
    pub fn install(&self, key: &str, provider: impl Into<Rc<MockInjected>>, flags: &[&str]) {
        self.installed.borrow_mut().insert(
            key.to_string(),
            Installed {
                provider: provider.into(),
                flags: flags.iter().map(|f| f.to_string()).collect(),
            },
        );
    }

    pub fn uninstall(&self, key: &str) {
        self.installed.borrow_mut().remove(key);
    }
}

impl Globals for MockGlobals {
    fn is_defined(&self, key: &str) -> bool {
        self.installed.borrow().contains_key(key)
    }

    fn flag(&self, key: &str, flag: &str) -> bool {
        self.installed
            .borrow()
            .get(key)
            .is_some_and(|entry| entry.flags.iter().any(|f| f == flag))
    }

    fn injected(&self, key: &str) -> Option<Rc<dyn InjectedProvider>> {
        self.installed
            .borrow()
            .get(key)
            .map(|entry| Rc::clone(&entry.provider) as Rc<dyn InjectedProvider>)
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Runs tasks with `tokio::task::spawn_local`. Must be used inside a `LocalSet`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed_local()
    }
}

// ============================================================================
// Session Harness
// ============================================================================

/// Account every harness wallet exposes.
pub const TEST_ADDRESS: &str = "0x1111111111111111111111111111111111111111";

/// One and a half ether in wei.
pub const TEST_BALANCE_WEI: u128 = 1_500_000_000_000_000_000;

/// Ethereum, Polygon and Sepolia, no auto-connect.
pub fn test_config() -> WalletConfig {
    WalletConfig::new(vec![
        presets::ethereum(),
        presets::polygon(),
        presets::sepolia(),
    ])
    .expect("preset chains are distinct")
}

/// Let spawned local tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// A session over MetaMask plus Coinbase, with handles on the mocks behind it.
pub struct Harness {
    pub session: WalletSession,
    pub globals: Rc<MockGlobals>,
    /// Provider behind `window.ethereum`.
    pub injected: Rc<MockInjected>,
    pub store: Rc<MemoryStore>,
}

impl Harness {
    /// Build a session. With `installed`, MetaMask is present at construction.
    pub fn new(config: WalletConfig, installed: bool, store: MemoryStore) -> Self {
        let globals = Rc::new(MockGlobals::new());
        let injected = Rc::new(
            MockInjected::new()
                .with_accounts(&[TEST_ADDRESS])
                .with_chain(1),
        );
        injected.set_balance(U256::from(TEST_BALANCE_WEI));
        if installed {
            globals.install("ethereum", Rc::clone(&injected), &["isMetaMask"]);
        }

        let wallets: Vec<RegisteredWallet> = vec![
            connectors::metamask(globals.clone()),
            connectors::coinbase(globals.clone()),
        ];
        let store = Rc::new(store);
        let session = WalletSession::new(
            config,
            wallets,
            Rc::clone(&store) as Rc<dyn SessionStore>,
            Rc::new(TokioScheduler),
        );
        Self {
            session,
            globals,
            injected,
            store,
        }
    }

    /// MetaMask installed, nothing saved.
    pub fn metamask(config: WalletConfig) -> Self {
        Self::new(config, true, MemoryStore::new())
    }

    /// Install MetaMask after the fact.
    pub fn install_metamask(&self) {
        self.globals
            .install("ethereum", Rc::clone(&self.injected), &["isMetaMask"]);
    }
}
