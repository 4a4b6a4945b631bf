use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{info, warn};

use wirehub_cli::{build_router, Config};

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind (default: `server.host` from config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default: `server.port` from config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Path prefix clients mount the protocol under (default: `server.url_prefix`)
    #[arg(long = "url-prefix", value_name = "PATH")]
    pub url_prefix: Option<String>,
}

impl ServeArgs {
    fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(prefix) = self.url_prefix {
            config.server.url_prefix = prefix;
        }
        config
    }
}

pub async fn cmd_serve(args: ServeArgs, config: Config) -> Result<()> {
    let config = args.apply(config);
    let router = build_router(&config);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "binding {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let addr = listener.local_addr().context("reading bound address")?;
    info!(%addr, prefix = %config.server.url_prefix, "wire server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("wire server terminated")?;

    info!("wire server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
