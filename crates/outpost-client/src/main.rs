use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use outpost_client::{ClientConfig, ClientTransport, Pipeline, SerialNmeaSource};
use outpost_core::Key;
use tracing_subscriber::EnvFilter;

/// Hand-rolled argument parsing: the only flag this binary takes is
/// `--config <path>`, so a manual loop over `std::env::args()` is enough.
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
    let config = ClientConfig::load(config_path.as_deref()).context("loading client config")?;

    let key = Key::load_from_file(&config.psk_path).context("loading pre-shared key")?;
    let target = tokio::net::lookup_host(&config.outpost_host)
        .await
        .context("resolving outpost_host")?
        .next()
        .context("outpost_host resolved to no addresses")?;

    let source = SerialNmeaSource::open(&config.device, config.baud).context("opening serial device")?;
    let transport = ClientTransport::connect(target, key).await.context("binding client UDP socket")?;

    tracing::info!(device = %config.device, host = %config.outpost_host, "outpost-client starting");

    let pipeline = Pipeline::new(
        source,
        transport,
        config.similarity_threshold,
        Duration::from_secs(config.flush_interval_secs),
    );

    tokio::select! {
        () = pipeline.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, discarding any unsent buffer");
        }
    }

    Ok(())
}
