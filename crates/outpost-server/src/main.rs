use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use outpost_server::{LoggingSink, ServerConfig, ServerTransport};
use outpost_core::Key;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Hand-rolled argument parsing, matching the client binary: the only
/// flag is `--config <path>`.
fn parse_args() -> Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config requires a path argument")?;
                config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("unrecognized argument: {other}"),
        }
    }

    Ok(config_path)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config_path = parse_args()?;
    let config = ServerConfig::load(config_path.as_deref()).context("loading server config")?;

    let key = Key::load_from_file(&config.psk_path).context("loading pre-shared key")?;
    let sink = Arc::new(
        LoggingSink::open(config.sink_path.clone())
            .await
            .context("opening fix sink")?,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let transport = ServerTransport::bind(&config.bind_addr(), key, sink, shutdown_rx)
        .await
        .context("binding server UDP socket")?;

    tracing::info!(bind = %config.bind_addr(), "outpost-server starting");

    tokio::select! {
        () = transport.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, closing listener");
            let _ = shutdown_tx.send(());
        }
    }

    Ok(())
}
