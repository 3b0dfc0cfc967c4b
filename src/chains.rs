//! A collection of providers and bundler clients for the supported chains.

use crate::{
    bundler::BundlerClient,
    config::{ChainConfig, RelayConfig},
};
use alloy::{
    primitives::{ChainId, map::HashMap},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::ClientBuilder,
    transports::layers::RetryBackoffLayer,
};

/// [`RetryBackoffLayer`] used for chain providers.
///
/// Max 10 retries with a backoff of 800ms; the CU/s is set to max value to
/// avoid any throttling.
const RETRY_LAYER: RetryBackoffLayer = RetryBackoffLayer::new(10, 800, u64::MAX);

/// A single supported chain.
#[derive(Debug, Clone)]
pub struct Chain {
    /// Provider for the chain RPC.
    pub provider: DynProvider,
    /// Client for the chain's bundler and paymaster endpoint.
    pub bundler: BundlerClient,
    /// Static configuration.
    pub config: ChainConfig,
    /// The chain ID.
    pub chain_id: ChainId,
}

/// A collection of supported chains, keyed by chain ID.
///
/// Read-only after construction; lookups take no lock.
#[derive(Clone)]
pub struct Chains {
    chains: HashMap<ChainId, Chain>,
}

impl Chains {
    /// Creates a new instance of [`Chains`] from configuration.
    ///
    /// Providers are lazy: nothing is dialed until the first request, so the
    /// configured chain ID is authoritative and a misconfigured RPC URL
    /// surfaces on the first prepare call for that chain.
    pub fn new(config: &RelayConfig) -> Self {
        let chains = HashMap::from_iter(config.chains.iter().map(|(&chain_id, chain_config)| {
            let client =
                ClientBuilder::default().layer(RETRY_LAYER).http(chain_config.rpc_url.clone());
            let provider = ProviderBuilder::new().connect_client(client).erased();
            let bundler = BundlerClient::new(chain_config.bundler_url.clone());
            (
                chain_id,
                Chain { provider, bundler, config: chain_config.clone(), chain_id },
            )
        }));

        Self { chains }
    }

    /// Get a chain by ID.
    pub fn get(&self, chain_id: ChainId) -> Option<&Chain> {
        self.chains.get(&chain_id)
    }

    /// Get an iterator over the supported chain IDs.
    pub fn chain_ids_iter(&self) -> impl Iterator<Item = &ChainId> {
        self.chains.keys()
    }
}

impl std::fmt::Debug for Chains {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chains").field("chains", &self.chains.keys()).finish()
    }
}
