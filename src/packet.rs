use socket2::{Domain, Protocol};

use crate::prober::ProbeError;

pub const ICMPV4_ECHO_REQUEST: u8 = 8;
pub const ICMPV4_ECHO_REPLY: u8 = 0;
pub const ICMPV6_ECHO_REQUEST: u8 = 128;
pub const ICMPV6_ECHO_REPLY: u8 = 129;

const HEADER_LEN: usize = 8;

/// Address family of one probe attempt, fixed at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// IANA protocol number (1 for ICMP, 58 for ICMPv6).
    pub fn protocol_number(self) -> u8 {
        match self {
            Family::V4 => 1,
            Family::V6 => 58,
        }
    }

    pub fn echo_request_type(self) -> u8 {
        match self {
            Family::V4 => ICMPV4_ECHO_REQUEST,
            Family::V6 => ICMPV6_ECHO_REQUEST,
        }
    }

    pub fn echo_reply_type(self) -> u8 {
        match self {
            Family::V4 => ICMPV4_ECHO_REPLY,
            Family::V6 => ICMPV6_ECHO_REPLY,
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            Family::V4 => Domain::IPV4,
            Family::V6 => Domain::IPV6,
        }
    }

    pub fn socket_protocol(self) -> Protocol {
        match self {
            Family::V4 => Protocol::ICMPV4,
            Family::V6 => Protocol::ICMPV6,
        }
    }
}

/// Echo request body. The identifier is stable for the process lifetime so
/// replies can be told apart from other pingers on the same host; the
/// sequence number distinguishes attempts.
#[derive(Debug, Clone)]
pub struct EchoRequest {
    pub ident: u16,
    pub seq: u16,
    pub payload: Vec<u8>,
}

impl EchoRequest {
    pub fn new(ident: u16, seq: u16) -> Self {
        Self {
            ident,
            seq,
            payload: Vec::new(),
        }
    }

    /// Serialize to the on-wire echo request for the given family:
    /// type, code=0, checksum, identifier, sequence, payload.
    ///
    /// The ICMPv6 checksum covers a pseudo-header the kernel owns on
    /// datagram sockets, so it is left zero and filled in by the kernel.
    pub fn encode(&self, family: Family) -> Result<Vec<u8>, ProbeError> {
        if self.payload.len() > 1472 {
            return Err(ProbeError::Serialize("payload exceeds one datagram"));
        }

        let mut pkt = Vec::with_capacity(HEADER_LEN + self.payload.len());
        pkt.extend_from_slice(&[family.echo_request_type(), 0, 0, 0]);
        pkt.extend_from_slice(&self.ident.to_be_bytes());
        pkt.extend_from_slice(&self.seq.to_be_bytes());
        pkt.extend_from_slice(&self.payload);

        if family == Family::V4 {
            let sum = checksum(&pkt);
            pkt[2..4].copy_from_slice(&sum.to_be_bytes());
        }
        Ok(pkt)
    }
}

/// Internet checksum over the packet with the checksum field zeroed (RFC 792).
fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
    }
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// A received ICMP/ICMPv6 message, decoded just far enough to classify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpReply {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub ident: u16,
    pub seq: u16,
}

impl IcmpReply {
    /// Parse received datagram bytes for the given family.
    ///
    /// Some platforms hand back the full IPv4 packet on datagram ICMP
    /// sockets; detect the version nibble and skip the IP header if so.
    /// ICMPv6 sockets never include the IP header.
    pub fn parse(family: Family, buf: &[u8]) -> Result<Self, ProbeError> {
        let body = match family {
            Family::V4 => strip_ipv4_header(buf),
            Family::V6 => buf,
        };
        if body.len() < HEADER_LEN {
            return Err(ProbeError::Parse("datagram shorter than ICMP header"));
        }
        Ok(Self {
            icmp_type: body[0],
            icmp_code: body[1],
            ident: u16::from_be_bytes([body[4], body[5]]),
            seq: u16::from_be_bytes([body[6], body[7]]),
        })
    }

    pub fn is_echo_reply(&self, family: Family) -> bool {
        self.icmp_type == family.echo_reply_type()
    }

    pub fn matches(&self, request: &EchoRequest) -> bool {
        self.ident == request.ident && self.seq == request.seq
    }
}

fn strip_ipv4_header(buf: &[u8]) -> &[u8] {
    if buf.len() >= 20 && (buf[0] >> 4) == 4 {
        let ihl = (buf[0] & 0x0F) as usize * 4;
        if ihl >= 20 && buf.len() > ihl {
            return &buf[ihl..];
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_echo_request_layout() {
        let req = EchoRequest::new(0x1234, 7);
        let pkt = req.encode(Family::V4).unwrap();
        assert_eq!(pkt.len(), 8);
        assert_eq!(pkt[0], ICMPV4_ECHO_REQUEST);
        assert_eq!(pkt[1], 0);
        assert_eq!(u16::from_be_bytes([pkt[4], pkt[5]]), 0x1234);
        assert_eq!(u16::from_be_bytes([pkt[6], pkt[7]]), 7);
        // Verifying the checksum over the full packet must yield zero.
        assert_eq!(checksum_verify(&pkt), 0);
    }

    #[test]
    fn v6_echo_request_leaves_checksum_to_kernel() {
        let pkt = EchoRequest::new(1, 1).encode(Family::V6).unwrap();
        assert_eq!(pkt[0], ICMPV6_ECHO_REQUEST);
        assert_eq!(&pkt[2..4], &[0, 0]);
    }

    #[test]
    fn parse_reply_without_ip_header() {
        let reply = make_v4_reply(0xbeef, 3);
        let parsed = IcmpReply::parse(Family::V4, &reply).unwrap();
        assert!(parsed.is_echo_reply(Family::V4));
        assert_eq!(parsed.ident, 0xbeef);
        assert_eq!(parsed.seq, 3);
    }

    #[test]
    fn parse_reply_with_ip_header_prefix() {
        let mut datagram = vec![0u8; 20];
        datagram[0] = 0x45; // IPv4, IHL 5
        datagram.extend_from_slice(&make_v4_reply(42, 1));
        let parsed = IcmpReply::parse(Family::V4, &datagram).unwrap();
        assert_eq!(parsed.ident, 42);
        assert_eq!(parsed.seq, 1);
    }

    #[test]
    fn parse_rejects_short_datagram() {
        assert!(matches!(
            IcmpReply::parse(Family::V6, &[129, 0, 0]),
            Err(ProbeError::Parse(_))
        ));
    }

    #[test]
    fn odd_length_payload_checksums() {
        let req = EchoRequest {
            ident: 9,
            seq: 9,
            payload: vec![0xAB],
        };
        let pkt = req.encode(Family::V4).unwrap();
        assert_eq!(checksum_verify(&pkt), 0);
    }

    #[test]
    fn protocol_numbers() {
        assert_eq!(Family::V4.protocol_number(), 1);
        assert_eq!(Family::V6.protocol_number(), 58);
    }

    fn make_v4_reply(ident: u16, seq: u16) -> Vec<u8> {
        let mut pkt = vec![ICMPV4_ECHO_REPLY, 0, 0, 0];
        pkt.extend_from_slice(&ident.to_be_bytes());
        pkt.extend_from_slice(&seq.to_be_bytes());
        let sum = checksum(&pkt);
        pkt[2..4].copy_from_slice(&sum.to_be_bytes());
        pkt
    }

    // One's-complement sum of a packet with its checksum in place is 0xFFFF,
    // so the final complement is zero for a valid packet.
    fn checksum_verify(data: &[u8]) -> u16 {
        let mut sum: u32 = 0;
        let mut chunks = data.chunks_exact(2);
        for chunk in &mut chunks {
            sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
        }
        if let [last] = chunks.remainder() {
            sum = sum.wrapping_add((*last as u32) << 8);
        }
        while (sum >> 16) != 0 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
        !(sum as u16)
    }
}
