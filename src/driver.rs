use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::PingConfig;
use crate::prober::{ProbeResult, Prober};
use crate::resolve;
use crate::stats::PingStats;

/// The monitoring loop: one probe at a time, a fixed pause between
/// attempts, a loss summary at a fixed cadence. Owns the counters; there
/// is no global state.
pub struct Driver {
    config: PingConfig,
    stats: PingStats,
}

impl Driver {
    pub fn new(config: PingConfig) -> Self {
        Self {
            config,
            stats: PingStats::default(),
        }
    }

    pub fn stats(&self) -> PingStats {
        self.stats
    }

    /// Probe `host` until the stop channel fires. Attempts are strictly
    /// sequential and every per-attempt failure (resolution included) is
    /// logged and counted as a loss rather than aborting the loop.
    pub async fn run<P: Prober>(
        &mut self,
        host: &str,
        prober: &P,
        mut stop: watch::Receiver<()>,
    ) {
        loop {
            self.stats.sent += 1;
            let seq = self.stats.sent as u16;

            // The target is re-resolved every attempt so DNS changes are
            // picked up without a restart.
            match resolve::resolve(host).await {
                Ok(target) => match prober.probe(&target, seq).await {
                    ProbeResult::Success { rtt } => {
                        self.stats.received += 1;
                        info!("Ping: {} ({}), RTT: {:?}", host, target.addr.ip(), rtt);
                    }
                    ProbeResult::Timeout => {
                        warn!(seq, "Ping: * (*), RTT: *");
                    }
                    ProbeResult::UnexpectedReply {
                        icmp_type,
                        icmp_code,
                        peer,
                    } => {
                        warn!(icmp_type, icmp_code, peer = ?peer, "Ping: * (*), RTT: *");
                    }
                    ProbeResult::Error(err) => {
                        warn!(%err, "Ping: * (*), RTT: *");
                    }
                },
                Err(err) => {
                    warn!(%err, "Ping: * (*), RTT: *");
                }
            }

            if self.stats.sent % self.config.summary_every == 0 {
                info!(
                    "Packet Loss: {}% ({} packets lost)",
                    self.stats.loss_percent().round(),
                    self.stats.lost()
                );
            }

            tokio::select! {
                _ = stop.changed() => break,
                _ = sleep(self.config.interval) => {}
            }
        }
    }
}
