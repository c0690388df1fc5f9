use std::io;
use std::mem::MaybeUninit;
use std::net::IpAddr;
use std::time::Duration;

use socket2::{SockAddr, Socket, Type};
use tokio::task;

use crate::config::PingConfig;
use crate::packet::EchoRequest;
use crate::prober::{EchoTransport, ProbeError, ProbeResult, Prober, probe_on};
use crate::resolve::Target;

/// Unprivileged datagram ICMP socket scoped to one probe attempt. The
/// kernel supplies the IP header, so no raw-socket privilege is needed.
/// Dropped (and the descriptor closed) when the attempt finishes.
pub struct IcmpSocket {
    socket: Socket,
    dest: SockAddr,
}

impl IcmpSocket {
    pub fn open(target: &Target) -> Result<Self, ProbeError> {
        let socket = Socket::new(
            target.family.domain(),
            Type::DGRAM,
            Some(target.family.socket_protocol()),
        )
        .map_err(ProbeError::Socket)?;
        Ok(Self {
            socket,
            dest: target.addr.into(),
        })
    }
}

impl EchoTransport for IcmpSocket {
    fn send(&mut self, packet: &[u8]) -> io::Result<()> {
        self.socket.send_to(packet, &self.dest).map(|_| ())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<IpAddr>)> {
        let mut raw = [MaybeUninit::<u8>::uninit(); 1500];
        let (len, peer) = self.socket.recv_from(&mut raw)?;
        let len = len.min(buf.len());
        for (dst, src) in buf.iter_mut().zip(&raw[..len]) {
            *dst = unsafe { src.assume_init() };
        }
        Ok((len, peer.as_socket().map(|sa| sa.ip())))
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        // A zero timeout means "block forever" to setsockopt; keep the
        // deadline honest by rounding up instead.
        self.socket
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))
    }
}

/// Probes over a fresh ICMP socket per attempt. The identifier is derived
/// from the process id once and reused for every attempt; the sequence
/// number comes from the driver.
pub struct IcmpProber {
    ident: u16,
    timeout: Duration,
    strict: bool,
}

impl IcmpProber {
    pub fn new(config: &PingConfig) -> Self {
        Self {
            ident: (std::process::id() & 0xffff) as u16,
            timeout: config.timeout,
            strict: config.strict_replies,
        }
    }
}

impl Prober for IcmpProber {
    async fn probe(&self, target: &Target, seq: u16) -> ProbeResult {
        let target = target.clone();
        let request = EchoRequest::new(self.ident, seq);
        let timeout = self.timeout;
        let strict = self.strict;

        // The reply wait is a blocking read with a hard socket deadline.
        let attempt = task::spawn_blocking(move || {
            let transport = match IcmpSocket::open(&target) {
                Ok(transport) => transport,
                Err(err) => return ProbeResult::Error(err),
            };
            probe_on(transport, target.family, &request, timeout, strict)
        });

        match attempt.await {
            Ok(result) => result,
            Err(err) => ProbeResult::Error(ProbeError::Internal(err.to_string())),
        }
    }
}
