mod config;
mod driver;
mod packet;
mod prober;
mod resolve;
mod stats;

use config::PingConfig;
use driver::Driver;
use prober::icmp::IcmpProber;

use tokio::sync::watch;
use tracing::info;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    let Some(host) = std::env::args().nth(1) else {
        eprintln!("Usage: ping <host>");
        std::process::exit(1);
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ping=info".parse()?),
        )
        .init();

    let config = PingConfig::default();
    let prober = IcmpProber::new(&config);

    // Ctrl-C trips the stop channel so an in-flight sleep ends cleanly.
    let (stop_tx, stop_rx) = watch::channel(());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(());
        }
    });

    info!(
        "pinging {} every {:?} (timeout {:?})",
        host, config.interval, config.timeout
    );

    let mut driver = Driver::new(config);
    driver.run(&host, &prober, stop_rx).await;

    let stats = driver.stats();
    info!(
        "Packet Loss: {}% ({} packets lost)",
        stats.loss_percent().round(),
        stats.lost()
    );
    Ok(())
}
