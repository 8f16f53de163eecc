//! Session state owned by the wallet state machine.

use crate::error::WalletError;

/// Connection status of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Snapshot of the wallet session.
///
/// Fields are only written through the transitions below, which keep
/// `Connected` paired with an address and chain, and `Disconnected` /
/// `Connecting` free of any address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    status: SessionStatus,
    address: Option<String>,
    chain_id: Option<u64>,
    balance: String,
    active_wallet_id: Option<String>,
    last_error: Option<WalletError>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Disconnected,
            address: None,
            chain_id: None,
            balance: "0".to_string(),
            active_wallet_id: None,
            last_error: None,
        }
    }
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Check if wallet is connected
    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.status == SessionStatus::Connecting
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// Native balance as a decimal string, `"0"` until refreshed.
    pub fn balance(&self) -> &str {
        &self.balance
    }

    pub fn active_wallet_id(&self) -> Option<&str> {
        self.active_wallet_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&WalletError> {
        self.last_error.as_ref()
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    pub(crate) fn begin_connect(&mut self) {
        *self = Self {
            status: SessionStatus::Connecting,
            ..Self::default()
        };
    }

    pub(crate) fn establish(&mut self, address: String, chain_id: u64, wallet_id: &str) {
        *self = Self {
            status: SessionStatus::Connected,
            address: Some(address),
            chain_id: Some(chain_id),
            active_wallet_id: Some(wallet_id.to_string()),
            ..Self::default()
        };
    }

    pub(crate) fn fail(&mut self, error: WalletError) {
        *self = Self {
            status: SessionStatus::Error,
            last_error: Some(error),
            ..Self::default()
        };
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn set_address(&mut self, address: String) {
        if self.is_connected() {
            self.address = Some(address);
        }
    }

    pub(crate) fn set_chain(&mut self, chain_id: u64) {
        if self.is_connected() {
            self.chain_id = Some(chain_id);
        }
    }

    pub(crate) fn set_balance(&mut self, balance: String) {
        self.balance = balance;
    }

    pub(crate) fn record_error(&mut self, error: WalletError) {
        self.last_error = Some(error);
    }
}
