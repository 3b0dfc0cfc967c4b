//! Relay spawn utilities.

use crate::{chains::Chains, cli::Args, config::RelayConfig, rpc::Relay, storage::RelayStorage};
use http::header;
use std::{net::SocketAddr, path::Path};
use tokio::{net::TcpListener, task::JoinHandle};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Context returned once the relay is launched.
#[derive(Debug)]
pub struct RelayHandle {
    /// The socket address to which the server is bound.
    pub local_addr: SocketAddr,
    /// The serving task.
    pub server: JoinHandle<std::io::Result<()>>,
    /// Storage of the relay, shared with the serving task.
    pub storage: RelayStorage,
}

impl RelayHandle {
    /// Returns the url to the http server.
    pub fn http_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }
}

/// Attempts to spawn the relay service using CLI arguments and a
/// configuration file.
///
/// If the file is missing, a default configuration is written there first so
/// a deployment has something concrete to edit.
pub async fn try_spawn_with_args<P: AsRef<Path>>(
    args: Args,
    config_path: P,
) -> eyre::Result<RelayHandle> {
    let config = if !config_path.as_ref().exists() {
        let config = args.merge_relay_config(RelayConfig::default());
        config.save_to_file(&config_path)?;
        config
    } else {
        args.merge_relay_config(RelayConfig::load_from_file(&config_path)?)
    };

    try_spawn(config).await
}

/// Spawns the relay service using the provided [`RelayConfig`].
pub async fn try_spawn(config: RelayConfig) -> eyre::Result<RelayHandle> {
    let chains = Chains::new(&config);
    let storage = RelayStorage::in_memory();
    let relay = Relay::new(chains, storage.clone());

    // The UI is a browser app served from elsewhere.
    let cors = CorsLayer::new()
        .allow_methods(AllowMethods::any())
        .allow_origin(AllowOrigin::any())
        .allow_headers([header::CONTENT_TYPE]);

    let app = relay
        .into_router()
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors));

    let listener = TcpListener::bind((config.server.address, config.server.port)).await?;
    let local_addr = listener.local_addr()?;

    info!(addr = %local_addr, "Started gasless relay");
    for (&chain_id, chain) in &config.chains {
        info!(chain_id, name = %chain.name, method = ?chain.method, "Serving chain");
    }

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    Ok(RelayHandle { local_addr, server, storage })
}
