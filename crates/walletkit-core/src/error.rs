//! Error types for wallet sessions.
//!
//! - [`WalletError`] - everything a session operation can fail with
//! - [`ProviderError`] - a raw EIP-1193 failure reported by the injected wallet
//! - [`ConfigError`] - invalid host configuration

use thiserror::Error;

/// Well-known EIP-1193 / JSON-RPC error codes.
pub mod codes {
    /// The user rejected the request in the wallet popup.
    pub const USER_REJECTED: i64 = 4001;
    /// The wallet has never seen the requested chain.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error, also used for malformed provider responses.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// A failed call against an injected wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error used when the wallet answered with something we cannot decode.
    pub fn malformed(what: &str) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("malformed {what} response"))
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == codes::USER_REJECTED
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == codes::UNRECOGNIZED_CHAIN
    }

    /// Network-class failures that show up while a chain switch settles.
    pub fn is_network_transient(&self) -> bool {
        let message = self.message.to_ascii_lowercase();
        message.contains("network changed") || message.contains("network_error")
    }
}

/// Errors surfaced by session operations.
///
/// `Clone` so the latest failure can live in the session snapshot and be
/// handed to every caller joined on the same in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The wallet's injected global is absent.
    #[error("{0} is not installed")]
    NotInstalled(String),
    /// The user refused the account request.
    #[error("connection rejected by user: {0}")]
    UserRejected(String),
    /// The handshake failed or returned no accounts.
    #[error("failed to connect: {0}")]
    ConnectError(String),
    /// No registered wallet has this id.
    #[error("wallet not found: {0}")]
    WalletNotFound(String),
    /// The wallet is registered but not currently installed.
    #[error("{0} is not installed")]
    WalletNotInstalled(String),
    #[error("a wallet connection is already in progress")]
    AlreadyConnecting,
    #[error("no wallet connected")]
    NotConnected,
    #[error("chain {0} is not supported")]
    UnsupportedChain(u64),
    #[error("failed to switch chain: {0}")]
    ChainSwitchFailed(String),
    /// A switch to a different chain is still being negotiated.
    #[error("a switch to chain {0} is already in progress")]
    SwitchInProgress(u64),
    /// The operation completed after a newer connect or disconnect took over.
    #[error("superseded by a newer wallet operation")]
    Superseded,
    /// Balance lookup failed. Absorbed by the session, never stored as `last_error`.
    #[error("failed to fetch balance: {0}")]
    BalanceFetch(String),
}

/// Invalid wallet configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("chain id {0} is configured more than once")]
    DuplicateChain(u64),
    #[error("invalid chain list: {0}")]
    InvalidChainList(String),
}
