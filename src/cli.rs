//! # Relay CLI

use crate::{config::RelayConfig, spawn::try_spawn_with_args};
use clap::Parser;
use std::{
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
};

/// The gasless relay service sponsors user operations for EIP-7702 accounts.
#[derive(Debug, Parser)]
#[command(author, about = "Gasless relay", long_about = None)]
pub struct Args {
    /// The configuration file.
    ///
    /// If missing, a default one will be used and stored in the working
    /// directory under `relay.yaml`.
    #[arg(long, value_name = "CONFIG", env = "RELAY_CONFIG", default_value = "relay.yaml")]
    pub config: PathBuf,
    /// The address to serve the HTTP API on.
    #[arg(long = "http.addr", value_name = "ADDR", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub address: IpAddr,
    /// The port to serve the HTTP API on.
    #[arg(long = "http.port", value_name = "PORT", default_value_t = 3002)]
    pub port: u16,
    /// API key appended to every bundler URL.
    #[arg(long = "bundler-api-key", value_name = "KEY", env = "PIMLICO_API_KEY")]
    pub bundler_api_key: Option<String>,
}

impl Args {
    /// Overrides the given configuration with the CLI arguments.
    pub fn merge_relay_config(&self, config: RelayConfig) -> RelayConfig {
        config
            .with_address(self.address)
            .with_port(self.port)
            .with_bundler_api_key(self.bundler_api_key.clone())
    }

    /// Run the relay service until the server task exits.
    pub async fn run(self) -> eyre::Result<()> {
        let config_path = self.config.clone();
        let handle = try_spawn_with_args(self, config_path).await?;
        handle.server.await??;
        Ok(())
    }
}
