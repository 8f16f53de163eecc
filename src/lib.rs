//! Browser wallet connections for Leptos applications.
//!
//! The state machine lives in [`walletkit_core`]; this crate binds it to
//! `window.ethereum`, `localStorage` and the page's event loop, and exposes
//! it to components as a reactive [`WalletContext`].
//!
//! ```ignore
//! use leptos::prelude::*;
//! use walletkit::{WalletConfig, presets, provide_wallet_context};
//!
//! #[component]
//! fn App() -> impl IntoView {
//!     walletkit::init();
//!     let config = WalletConfig::new(vec![presets::ethereum(), presets::polygon()])
//!         .map(|c| c.with_auto_connect(true));
//!     if let Ok(config) = config {
//!         provide_wallet_context(config);
//!     }
//!     view! { <Wallet/> }
//! }
//! ```

mod app;
pub mod config;
mod logging;
pub mod utils;
pub mod wallet;

pub use app::{WalletContext, provide_wallet_context, provide_wallet_context_with, use_wallet};
pub use logging::init_logging;
pub use walletkit_core::models::presets;
pub use walletkit_core::{
    ChainDescriptor, SessionState, SessionStatus, Snapshot, WalletConfig, WalletDescriptor,
    WalletError, WalletSession,
};

/// Install the panic hook and the console logger at the default level.
pub fn init() {
    console_error_panic_hook::set_once();
    init_logging(config::DEFAULT_LOG_LEVEL);
}
