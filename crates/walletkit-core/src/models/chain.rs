//! Chain descriptors supplied by the host application.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

// ============================================================================
// Descriptor Types
// ============================================================================

/// Native currency of a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Block explorer shown by wallets for a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockExplorer {
    pub name: String,
    pub url: String,
}

/// A blockchain network the application supports.
///
/// Deserializes from the camelCase shape hosts usually keep in JSON:
///
/// ```json
/// { "id": 137, "name": "Polygon", "rpcUrl": "https://polygon-rpc.com",
///   "currency": { "name": "POL", "symbol": "POL", "decimals": 18 },
///   "blockExplorer": { "name": "PolygonScan", "url": "https://polygonscan.com" } }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub id: u64,
    pub name: String,
    pub rpc_url: String,
    #[serde(rename = "currency", alias = "nativeCurrency")]
    pub native_currency: NativeCurrency,
    pub block_explorer: BlockExplorer,
}

/// Parameters for `wallet_addEthereumChain` (EIP-3085).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl ChainDescriptor {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        rpc_url: impl Into<String>,
        native_currency: NativeCurrency,
        block_explorer: BlockExplorer,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            rpc_url: rpc_url.into(),
            native_currency,
            block_explorer,
        }
    }

    /// Chain id in the wallet RPC encoding (`0x`-prefixed lowercase hex).
    pub fn hex_id(&self) -> String {
        chain_id_hex(self.id)
    }

    /// Build add-chain params around an already encoded chain id.
    ///
    /// Takes the encoded id rather than re-deriving it so the add request
    /// carries exactly what the preceding switch request sent.
    pub fn add_chain_params(&self, chain_id: &str) -> AddChainParams {
        AddChainParams {
            chain_id: chain_id.to_string(),
            chain_name: self.name.clone(),
            native_currency: self.native_currency.clone(),
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.block_explorer.url.clone()],
        }
    }
}

/// Encode a chain id the way wallets expect it (`137` -> `"0x89"`).
pub fn chain_id_hex(id: u64) -> String {
    format!("{id:#x}")
}

/// Decode a chain id as reported by a wallet.
///
/// Accepts hex strings (`"0x89"`), decimal strings (`"137"`) and JSON numbers.
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

// ============================================================================
// Chain Set
// ============================================================================

/// Ordered set of configured chains with unique ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainSet {
    chains: Vec<ChainDescriptor>,
}

impl ChainSet {
    pub fn new(chains: Vec<ChainDescriptor>) -> Result<Self, ConfigError> {
        for (i, chain) in chains.iter().enumerate() {
            if chains[..i].iter().any(|other| other.id == chain.id) {
                return Err(ConfigError::DuplicateChain(chain.id));
            }
        }
        Ok(Self { chains })
    }

    pub fn get(&self, id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Commonly used chain descriptors.
pub mod presets {
    use super::{BlockExplorer, ChainDescriptor, NativeCurrency};

    fn ether(name: &str) -> NativeCurrency {
        NativeCurrency {
            name: name.to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }

    fn explorer(name: &str, url: &str) -> BlockExplorer {
        BlockExplorer {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    pub fn ethereum() -> ChainDescriptor {
        ChainDescriptor::new(
            1,
            "Ethereum",
            "https://eth.llamarpc.com",
            ether("Ether"),
            explorer("Etherscan", "https://etherscan.io"),
        )
    }

    pub fn sepolia() -> ChainDescriptor {
        ChainDescriptor::new(
            11155111,
            "Sepolia",
            "https://rpc.sepolia.org",
            ether("Sepolia Ether"),
            explorer("Etherscan", "https://sepolia.etherscan.io"),
        )
    }

    pub fn polygon() -> ChainDescriptor {
        ChainDescriptor::new(
            137,
            "Polygon",
            "https://polygon-rpc.com",
            NativeCurrency {
                name: "POL".to_string(),
                symbol: "POL".to_string(),
                decimals: 18,
            },
            explorer("PolygonScan", "https://polygonscan.com"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_id_hex() {
        assert_eq!(chain_id_hex(1), "0x1");
        assert_eq!(chain_id_hex(137), "0x89");
        assert_eq!(chain_id_hex(11155111), "0xaa36a7");
    }

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id(&json!("0x89")), Some(137));
        assert_eq!(parse_chain_id(&json!("137")), Some(137));
        assert_eq!(parse_chain_id(&json!(1)), Some(1));
        assert_eq!(parse_chain_id(&json!("0xzz")), None);
        assert_eq!(parse_chain_id(&json!(null)), None);
    }

    #[test]
    fn test_add_chain_params_shape() {
        let polygon = presets::polygon();
        let params = serde_json::to_value(polygon.add_chain_params(&polygon.hex_id())).unwrap();
        assert_eq!(
            params,
            json!({
                "chainId": "0x89",
                "chainName": "Polygon",
                "nativeCurrency": { "name": "POL", "symbol": "POL", "decimals": 18 },
                "rpcUrls": ["https://polygon-rpc.com"],
                "blockExplorerUrls": ["https://polygonscan.com"],
            })
        );
    }

    #[test]
    fn test_descriptor_from_json() {
        let chain: ChainDescriptor = serde_json::from_value(json!({
            "id": 137,
            "name": "Polygon",
            "rpcUrl": "https://polygon-rpc.com",
            "currency": { "name": "POL", "symbol": "POL", "decimals": 18 },
            "blockExplorer": { "name": "PolygonScan", "url": "https://polygonscan.com" }
        }))
        .unwrap();
        assert_eq!(chain, presets::polygon());
    }

    #[test]
    fn test_chain_set_rejects_duplicates() {
        let err = ChainSet::new(vec![presets::ethereum(), presets::ethereum()]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateChain(1));
    }

    #[test]
    fn test_chain_set_lookup() {
        let set = ChainSet::new(vec![presets::ethereum(), presets::polygon()]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(137));
        assert!(!set.contains(10));
        assert_eq!(set.get(1).map(|c| c.name.as_str()), Some("Ethereum"));
    }
}
