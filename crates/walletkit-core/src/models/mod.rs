//! Data models for wallet sessions.
//!
//! - [`ChainDescriptor`], [`ChainSet`] - configured networks
//! - [`WalletDescriptor`] - wallet display metadata with the derived `installed` flag
//! - [`SessionState`], [`SessionStatus`] - the session snapshot

mod chain;
mod session;
mod wallet;

pub use chain::{
    AddChainParams, BlockExplorer, ChainDescriptor, ChainSet, NativeCurrency, chain_id_hex,
    parse_chain_id, presets,
};
pub use session::{SessionState, SessionStatus};
pub use wallet::WalletDescriptor;
