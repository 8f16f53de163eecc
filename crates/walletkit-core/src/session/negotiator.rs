//! Chain switch negotiation.
//!
//! Wallets refuse to switch to a chain they have never seen, so a switch
//! that fails with 4902 is retried as an add-chain request built from the
//! configured descriptor. Both requests carry the same encoded chain id.

use serde_json::json;

use crate::config::EVENT_NAMESPACE;
use crate::error::{ProviderError, WalletError, codes};
use crate::models::ChainDescriptor;
use crate::provider::ProviderHandle;

/// Move the wallet to `chain`, registering the chain first if needed.
pub async fn negotiate(provider: &dyn ProviderHandle, chain: &ChainDescriptor) -> Result<(), WalletError> {
    let chain_id = chain.hex_id();
    log::debug!(target: EVENT_NAMESPACE, "switching to {} ({chain_id})", chain.name);

    let switched = provider
        .request(
            "wallet_switchEthereumChain",
            Some(json!([{ "chainId": chain_id }])),
        )
        .await;

    match switched {
        Ok(_) => Ok(()),
        Err(err) if err.is_unrecognized_chain() => {
            log::info!(target: EVENT_NAMESPACE, "{} unknown to wallet, adding it", chain.name);
            add_chain(provider, chain, &chain_id).await
        }
        Err(err) => Err(switch_failed(err)),
    }
}

async fn add_chain(
    provider: &dyn ProviderHandle,
    chain: &ChainDescriptor,
    chain_id: &str,
) -> Result<(), WalletError> {
    let params = json!([chain.add_chain_params(chain_id)]);

    match provider
        .request("wallet_addEthereumChain", Some(params.clone()))
        .await
    {
        Ok(_) => Ok(()),
        // Invalid params on add gets exactly one retry.
        Err(err) if err.code == codes::INVALID_PARAMS => {
            log::debug!(target: EVENT_NAMESPACE, "add chain rejected params, retrying: {err}");
            provider
                .request("wallet_addEthereumChain", Some(params))
                .await
                .map(|_| ())
                .map_err(switch_failed)
        }
        Err(err) => Err(switch_failed(err)),
    }
}

fn switch_failed(err: ProviderError) -> WalletError {
    WalletError::ChainSwitchFailed(err.message)
}
