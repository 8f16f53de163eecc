//! Native balance refresh.

use alloy_primitives::U256;
use alloy_primitives::utils::format_units;

use crate::config::EVENT_NAMESPACE;
use crate::error::WalletError;
use crate::provider::ProviderHandle;

/// Outcome of a balance refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BalanceUpdate {
    /// Store this balance.
    Set(String),
    /// Leave the last known balance in place.
    Keep,
}

/// Fetch the native balance of `address` as a human-scaled decimal string.
///
/// Never fails. A network-class error (the provider is still moving to a
/// new chain) keeps the last known balance; any other error yields `"0"`.
pub async fn refresh(provider: &dyn ProviderHandle, address: &str, decimals: u8) -> BalanceUpdate {
    match provider.balance_of(address).await {
        Ok(amount) => BalanceUpdate::Set(format_balance(amount, decimals)),
        Err(err) => {
            let transient = err.is_network_transient();
            let err = WalletError::BalanceFetch(err.message);
            if transient {
                log::debug!(target: EVENT_NAMESPACE, "{err} during a network change, keeping last balance");
                BalanceUpdate::Keep
            } else {
                log::warn!(target: EVENT_NAMESPACE, "{err} (address {address})");
                BalanceUpdate::Set("0".to_string())
            }
        }
    }
}

/// Scale a smallest-unit amount by `decimals`.
///
/// Keeps at least one fractional digit and trims the rest of the trailing
/// zeros: `1.5`, `2.0`, `0.000001`.
pub fn format_balance(amount: U256, decimals: u8) -> String {
    let Ok(formatted) = format_units(amount, decimals) else {
        return amount.to_string();
    };
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{formatted}.0"),
    }
}
