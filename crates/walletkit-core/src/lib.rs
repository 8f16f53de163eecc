//! Platform-agnostic wallet connection core.
//!
//! Holds everything about a browser wallet session that does not touch the
//! DOM: the wallet registry, installation detection, connector adapters,
//! the session state machine, chain-switch negotiation and balance refresh.
//! Browser access goes through the capability traits in [`provider`],
//! [`runtime`] and [`storage`], so the whole state machine runs natively
//! under test.

pub mod config;
pub mod connectors;
pub mod detector;
pub mod error;
pub mod events;
pub mod models;
pub mod provider;
pub mod runtime;
pub mod session;
pub mod storage;

#[cfg(any(test, feature = "mock"))]
pub mod testing;

pub use config::WalletConfig;
pub use connectors::{Connection, Connector, RegisteredWallet, default_wallets};
pub use detector::{InstallWatcher, PollPolicy, WalletKind};
pub use error::{ConfigError, ProviderError, WalletError};
pub use events::{EventSink, WalletEvent};
pub use models::{
    ChainDescriptor, ChainSet, NativeCurrency, SessionState, SessionStatus, WalletDescriptor,
};
pub use provider::{Globals, InjectedProvider, ProviderHandle};
pub use runtime::Scheduler;
pub use session::{Snapshot, WalletSession, WatchId};
pub use storage::{MemoryStore, SessionStore};
