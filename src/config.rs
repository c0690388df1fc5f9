use std::time::Duration;

/// Knobs for the monitoring loop. Held by the driver; there is no config
/// file and no hot reload, the defaults are the tool's documented behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingConfig {
    /// How long one attempt waits for a reply. Deployments of this tool
    /// have run with anything from 500ms to 10s, so it is a knob rather
    /// than a constant.
    pub timeout: Duration,
    /// Pause between attempts.
    pub interval: Duration,
    /// Emit a packet-loss summary every this many attempts.
    pub summary_every: u64,
    /// Require the reply's identifier and sequence to match the request.
    /// Turning this off accepts any echo reply on the socket, which is
    /// what older builds did.
    pub strict_replies: bool,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            interval: Duration::from_secs(2),
            summary_every: 10,
            strict_replies: true,
        }
    }
}
