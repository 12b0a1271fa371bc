use acmemole::{Config, SharedConfig};
use anyhow::Result;
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let config: SharedConfig = Arc::new(Config::from_env()?);
    let store = acmemole::store::init(config.store_kind, &config.store_options).await?;

    if std::io::stdout().is_terminal() {
        println!("{}", acmemole::mole::MOLE);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tracing::info!("authoritative for {}", &config.domain);
    tracing::info!("DNS listening on UDP {}", &config.dns_bind_addr);
    let dns_server = acmemole::dns::new(config.clone(), store.clone(), shutdown_rx).await?;
    let mut dns_handle = tokio::spawn(dns_server.block_until_done());

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = acmemole::api::new(config.clone(), store.clone());
    let mut api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
            let _ = shutdown_tx.send(true);
            // Let the listener finish datagrams already in flight.
            let _ = (&mut dns_handle).await;
        },
        Ok(dns_res) = &mut dns_handle => {
            if let Err(err) = dns_res {
                return Err(err.into());
            }
        }
        Ok(api_res) = &mut api_handle => {
            if let Err(err) = api_res {
                return Err(err.into());
            }
        }
    }
    store.close().await?;
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acmemole=info".into()),
        )
        .init();
}
