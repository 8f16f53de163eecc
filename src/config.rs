//! Browser-side configuration.
//!
//! Core constants (storage key, timing, poll policy) live in
//! `walletkit_core::config`; this module only adds what the DOM layer needs.

pub use walletkit_core::config::{EVENT_NAMESPACE, SESSION_STORAGE_KEY, WalletConfig};

// =============================================================================
// DOM Events
// =============================================================================

/// Window event a page (or extension shim) may dispatch after injecting a wallet.
pub const WALLET_INSTALLED_EVENT: &str = "wallet-installed";

/// Window event fired when the tab regains focus.
pub const FOCUS_EVENT: &str = "focus";

/// Document event fired when the tab becomes visible or hidden.
pub const VISIBILITY_EVENT: &str = "visibilitychange";

// =============================================================================
// Logging
// =============================================================================

/// Default console log level.
pub const DEFAULT_LOG_LEVEL: log::LevelFilter = if cfg!(debug_assertions) {
    log::LevelFilter::Debug
} else {
    log::LevelFilter::Info
};
