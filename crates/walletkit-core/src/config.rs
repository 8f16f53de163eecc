//! Wallet configuration.
//!
//! Centralizes the constants used by the session and the host-facing
//! [`WalletConfig`].

use std::time::Duration;

use crate::detector::PollPolicy;
use crate::error::ConfigError;
use crate::models::{ChainDescriptor, ChainSet};

// =============================================================================
// Persistence
// =============================================================================

/// Storage key holding the last connected wallet id.
pub const SESSION_STORAGE_KEY: &str = "walletkit:last-wallet";

// =============================================================================
// Events & Logging
// =============================================================================

/// Namespace of the wallet event bus, also the `log` target.
pub const EVENT_NAMESPACE: &str = "walletkit";

// =============================================================================
// Timing
// =============================================================================

/// Wait after a chain switch before trusting balance queries, in milliseconds.
pub const SETTLE_DELAY_MS: u64 = 1000;

/// Installation poll defaults.
pub mod install_poll {
    /// First poll delay in milliseconds.
    pub const INITIAL_MS: u64 = 1000;
    /// Delay multiplier between attempts.
    pub const BACKOFF_FACTOR: u32 = 2;
    /// Upper bound for a single delay in milliseconds.
    pub const CAP_MS: u64 = 8000;
    /// Attempts before giving up.
    pub const MAX_ATTEMPTS: u32 = 10;
}

// =============================================================================
// Balances
// =============================================================================

/// Decimals assumed when the active chain is not configured.
pub const DEFAULT_DECIMALS: u8 = 18;

// =============================================================================
// Host Configuration
// =============================================================================

/// Configuration supplied by the host application at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletConfig {
    chains: ChainSet,
    auto_connect: bool,
    settle_delay: Duration,
    install_poll: PollPolicy,
}

impl WalletConfig {
    /// Create a configuration for the given chains.
    ///
    /// Fails if two chains share an id.
    pub fn new(chains: Vec<ChainDescriptor>) -> Result<Self, ConfigError> {
        Ok(Self {
            chains: ChainSet::new(chains)?,
            auto_connect: false,
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            install_poll: PollPolicy::default(),
        })
    }

    /// Create a configuration from a JSON array of chain descriptors.
    pub fn chains_from_json(json: &str) -> Result<Self, ConfigError> {
        let chains: Vec<ChainDescriptor> =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidChainList(e.to_string()))?;
        Self::new(chains)
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_install_poll(mut self, policy: PollPolicy) -> Self {
        self.install_poll = policy;
        self
    }

    pub fn chains(&self) -> &ChainSet {
        &self.chains
    }

    pub fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn install_poll(&self) -> PollPolicy {
        self.install_poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::presets;

    #[test]
    fn test_defaults() {
        let config = WalletConfig::new(vec![presets::ethereum()]).unwrap();
        assert!(!config.auto_connect());
        assert_eq!(config.settle_delay(), Duration::from_millis(1000));
        assert_eq!(config.install_poll(), PollPolicy::default());
        assert_eq!(config.chains().len(), 1);
    }

    #[test]
    fn test_chains_from_json() {
        let config = WalletConfig::chains_from_json(
            r#"[{
                "id": 1,
                "name": "Ethereum",
                "rpcUrl": "https://eth.llamarpc.com",
                "currency": { "name": "Ether", "symbol": "ETH", "decimals": 18 },
                "blockExplorer": { "name": "Etherscan", "url": "https://etherscan.io" }
            }]"#,
        )
        .unwrap()
        .with_auto_connect(true);
        assert!(config.auto_connect());
        assert_eq!(config.chains().get(1), Some(&presets::ethereum()));
    }

    #[test]
    fn test_chains_from_invalid_json() {
        let err = WalletConfig::chains_from_json("{}").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChainList(_)));
    }

    #[test]
    fn test_duplicate_chain_rejected() {
        let err = WalletConfig::new(vec![presets::polygon(), presets::polygon()]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateChain(137));
    }
}
