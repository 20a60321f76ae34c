mod common;
mod config;
mod external;
mod pipeline;
mod routes;

use std::sync::Arc;

use crate::common::state::AppState;
use crate::config::Config;
use crate::external::registry::RegistryClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    tracing::info!(
        app = %config.app_name,
        deployment = %config.deployment.to_uppercase(),
        "starting server"
    );

    let http = Arc::new(reqwest::Client::new());
    let registry = Arc::new(RegistryClient::new(http, config.registry_host.clone()));
    let s3_client = external::s3::get_client(&config).await;

    let state = AppState { config, registry, s3_client };
    let router = routes::build_router(state);

    let addr: std::net::SocketAddr = "0.0.0.0:3000".parse().unwrap();
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, router.into_make_service())
        .await
        .expect("server exited unexpectedly");
}
