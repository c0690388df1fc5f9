use std::net::{IpAddr, SocketAddr};

use crate::packet::Family;
use crate::prober::ProbeError;

/// A resolved probe target. Derived once per attempt and immutable for its
/// lifetime; the socket address keeps the IPv6 scope id when one was given.
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub addr: SocketAddr,
    pub family: Family,
}

impl Target {
    fn from_addr(host: &str, addr: SocketAddr) -> Self {
        let family = match addr.ip() {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        };
        Self {
            host: host.to_string(),
            addr,
            family,
        }
    }
}

/// Resolve a host string (literal IP or DNS name) to a probe target.
///
/// Literal addresses short-circuit the resolver. For names, the first
/// address the system resolver returns wins and fixes the family for the
/// rest of the attempt; an IPv4 answer means an IPv4 probe.
pub async fn resolve(host: &str) -> Result<Target, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(Target::from_addr(host, SocketAddr::new(ip, 0)));
    }

    let lookup = format!("{}:0", host);
    let mut addrs = tokio::net::lookup_host(&lookup)
        .await
        .map_err(|source| ProbeError::Resolution {
            host: host.to_string(),
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ProbeError::Resolution {
        host: host.to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "resolver returned no addresses",
        ),
    })?;
    Ok(Target::from_addr(host, addr))
}
