//! Relay configuration.

use crate::constants::ENTRYPOINT_V07;
use alloy::primitives::{Address, ChainId, TxHash, map::HashMap};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr},
    path::Path,
};
use url::Url;

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chain configurations, keyed by chain ID.
    pub chains: HashMap<ChainId, ChainConfig>,
}

impl RelayConfig {
    /// Sets the IP address to serve on.
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.server.address = address;
        self
    }

    /// Sets the port to serve on.
    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Appends `apikey` to every bundler URL. Managed bundler endpoints such
    /// as Pimlico authenticate through this query parameter.
    pub fn with_bundler_api_key(mut self, api_key: Option<String>) -> Self {
        let Some(api_key) = api_key else { return self };
        for chain in self.chains.values_mut() {
            chain.bundler_url.query_pairs_mut().append_pair("apikey", &api_key);
        }
        self
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chains: HashMap::from_iter([
                (
                    80002,
                    ChainConfig {
                        name: "Polygon Amoy".into(),
                        rpc_url: parse_url("https://rpc-amoy.polygon.technology"),
                        bundler_url: parse_url("https://api.pimlico.io/v2/80002/rpc"),
                        entry_point: ENTRYPOINT_V07,
                        explorer_url: parse_url("https://amoy.polygonscan.com"),
                        method: GaslessMethod::Eip7702,
                    },
                ),
                (
                    11155111,
                    ChainConfig {
                        name: "Ethereum Sepolia".into(),
                        rpc_url: parse_url("https://ethereum-sepolia-rpc.publicnode.com"),
                        bundler_url: parse_url("https://api.pimlico.io/v2/11155111/rpc"),
                        entry_point: ENTRYPOINT_V07,
                        explorer_url: parse_url("https://sepolia.etherscan.io"),
                        method: GaslessMethod::Eip7702,
                    },
                ),
            ]),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address to serve on.
    pub address: IpAddr,
    /// The port to serve on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 3002 }
    }
}

/// A single supported chain. Read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Human readable chain name.
    pub name: String,
    /// Chain JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Combined bundler and paymaster JSON-RPC endpoint.
    pub bundler_url: Url,
    /// The EntryPoint contract the operations bind to.
    #[serde(default = "default_entry_point")]
    pub entry_point: Address,
    /// Block explorer base URL.
    pub explorer_url: Url,
    /// How accounts on this chain go gasless.
    #[serde(default)]
    pub method: GaslessMethod,
}

impl ChainConfig {
    /// Explorer link for a transaction.
    pub fn tx_url(&self, tx_hash: TxHash) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.as_str().trim_end_matches('/'))
    }
}

/// How a chain's accounts are made gasless.
///
/// Selected once per chain from configuration rather than probed at runtime
/// from wallet capability payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GaslessMethod {
    /// EOAs delegated via EIP-7702, executing through the v0.7 EntryPoint.
    #[default]
    Eip7702,
    /// Deployed ERC-4337 smart accounts.
    Erc4337,
}

fn default_entry_point() -> Address {
    ENTRYPOINT_V07
}

fn parse_url(url: &str) -> Url {
    // Only used for the static defaults above.
    url.parse().expect("default URL is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let config = RelayConfig::default();

        let file = tempfile::NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();

        assert_eq!(config, RelayConfig::load_from_file(file.path()).unwrap());
    }

    #[test]
    fn default_chains_cover_amoy_and_sepolia() {
        let config = RelayConfig::default();
        assert!(config.chains.contains_key(&80002));
        assert!(config.chains.contains_key(&11155111));
        assert!(config.chains.values().all(|c| c.entry_point == ENTRYPOINT_V07));
    }

    #[test]
    fn bundler_api_key_is_appended() {
        let config = RelayConfig::default().with_bundler_api_key(Some("pim_test".into()));
        for chain in config.chains.values() {
            assert!(chain.bundler_url.query().unwrap().contains("apikey=pim_test"));
        }
    }

    #[test]
    fn tx_url_joins_explorer_and_hash() {
        let chain = RelayConfig::default().chains[&80002].clone();
        let tx = TxHash::ZERO;
        assert_eq!(chain.tx_url(tx), format!("https://amoy.polygonscan.com/tx/{tx}"));
    }
}
