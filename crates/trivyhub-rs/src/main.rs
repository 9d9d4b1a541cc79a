mod api;
mod config;
mod exporter;
mod identity;
mod mapper;
mod models;
mod reports;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing::info;

use crate::{
    config::AppConfig,
    exporter::{FindingsSink, SecurityHubSink},
    identity::{IdentityResolver, StsIdentityResolver},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub sink: Arc<dyn FindingsSink>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::load()?);
    info!(?config, "loaded configuration");

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let state = AppState {
        config: config.clone(),
        resolver: Arc::new(StsIdentityResolver::new(&aws_config)),
        sink: Arc::new(SecurityHubSink::new(&aws_config)),
    };

    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "TrivyHub-RS listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
}
