// src/main.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warp_provision::{relay, ClientConfig, Provisioner, RelayConfig};

#[derive(Parser)]
#[command(name = "warp-provision", version, about = "WARP config generator and CORS relay")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Serve the relay in front of the key and registration endpoints
    Relay,
    /// Register a new identity and print both configs
    Provision {
        /// Also write the tunnel config into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().cmd {
        Cmd::Relay => serve_relay(RelayConfig::from_env()).await,
        Cmd::Provision { out } => provision(ClientConfig::from_env(), out).await,
    }
}

async fn serve_relay(config: RelayConfig) -> anyhow::Result<()> {
    let app = relay::router(&config)?;
    info!("relay listening on {}", config.bind);
    let listener = TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}

async fn provision(config: ClientConfig, out: Option<PathBuf>) -> anyhow::Result<()> {
    let provisioner = Provisioner::new(&config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let configs = provisioner.provision_with_cancel(&cancel).await?;

    for artifact in [&configs.tunnel, &configs.proxy] {
        println!("# {}\n{}\n", artifact.kind().name(), artifact.text().trim_end());
    }

    if let (Some(dir), Some(name)) = (out, configs.tunnel.file_name()) {
        let path = dir.join(name);
        tokio::fs::write(&path, configs.tunnel.text()).await?;
        info!("wrote {}", path.display());
    }
    Ok(())
}
