use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::packet::{EchoRequest, Family, IcmpReply};
use crate::resolve::Target;

pub mod icmp;

/// Everything that can go wrong inside one probe attempt. All of these are
/// recoverable at the driver level: a failed attempt is logged and counted
/// as a loss, and the loop moves on.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to resolve {host}: {source}")]
    Resolution { host: String, source: io::Error },
    #[error("failed to open icmp socket: {0}")]
    Socket(#[source] io::Error),
    #[error("failed to serialize echo request: {0}")]
    Serialize(&'static str),
    #[error("failed to send echo request: {0}")]
    Transmit(#[source] io::Error),
    #[error("failed to receive reply: {0}")]
    Receive(#[source] io::Error),
    #[error("failed to parse reply: {0}")]
    Parse(&'static str),
    #[error("probe task failed: {0}")]
    Internal(String),
}

/// Outcome of one echo round-trip.
#[derive(Debug)]
pub enum ProbeResult {
    Success {
        rtt: Duration,
    },
    /// The deadline passed with no usable reply. A normal outcome.
    Timeout,
    /// A datagram arrived but carried something other than an echo reply,
    /// e.g. destination-unreachable or time-exceeded.
    UnexpectedReply {
        icmp_type: u8,
        icmp_code: u8,
        peer: Option<IpAddr>,
    },
    Error(ProbeError),
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success { .. })
    }
}

/// One probe implementation per transport. The driver only sees this seam,
/// so tests can substitute a scripted prober.
pub trait Prober: Send + Sync {
    fn probe(
        &self,
        target: &Target,
        seq: u16,
    ) -> impl std::future::Future<Output = ProbeResult> + Send;
}

/// Datagram transport for one attempt. The real implementation is an
/// unprivileged ICMP socket; tests feed in canned replies.
pub trait EchoTransport {
    fn send(&mut self, packet: &[u8]) -> io::Result<()>;
    /// Blocks for at most the configured read timeout.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<IpAddr>)>;
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

/// Execute exactly one echo round-trip on an already-open transport.
///
/// The attempt walks Idle -> Sent -> {Replied | TimedOut | Failed} and is
/// terminal in one call; there is no retry and no second in-flight request.
/// The transport is consumed so it is released on every exit path.
///
/// With `strict` set, an echo reply whose identifier or sequence does not
/// match the request is discarded and the wait continues; with it unset any
/// echo reply on the socket is accepted (legacy-compatible behavior).
pub fn probe_on<T: EchoTransport>(
    mut transport: T,
    family: Family,
    request: &EchoRequest,
    timeout: Duration,
    strict: bool,
) -> ProbeResult {
    let wire = match request.encode(family) {
        Ok(wire) => wire,
        Err(err) => return ProbeResult::Error(err),
    };

    let start = Instant::now();
    if let Err(err) = transport.send(&wire) {
        return ProbeResult::Error(ProbeError::Transmit(err));
    }
    let deadline = start + timeout;

    let mut buf = [0u8; 1500];
    loop {
        let now = Instant::now();
        if now >= deadline {
            return ProbeResult::Timeout;
        }
        if let Err(err) = transport.set_read_timeout(deadline - now) {
            return ProbeResult::Error(ProbeError::Receive(err));
        }

        let (len, peer) = match transport.recv(&mut buf) {
            Ok(received) => received,
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => return ProbeResult::Error(ProbeError::Receive(err)),
        };
        let rtt = start.elapsed();

        let reply = match IcmpReply::parse(family, &buf[..len]) {
            Ok(reply) => reply,
            Err(err) => return ProbeResult::Error(err),
        };

        if reply.is_echo_reply(family) {
            if !strict || reply.matches(request) {
                return ProbeResult::Success { rtt };
            }
            // Someone else's reply on a strict probe; keep waiting.
            continue;
        }
        return ProbeResult::UnexpectedReply {
            icmp_type: reply.icmp_type,
            icmp_code: reply.icmp_code,
            peer,
        };
    }
}
