//! ICMP Packet Building and Parsing
//!
//! ```text
//!  0        8        16               31
//! ┌────────┬────────┬─────────────────┐
//! │  Type  │  Code  │    Checksum     │
//! ├────────┴────────┼─────────────────┤
//! │   Identifier    │    Sequence     │
//! ├─────────────────┴─────────────────┤
//! │        Payload (16 bytes)         │
//! └───────────────────────────────────┘
//! ```
//!
//! In raw IP mode the chip prefixes every received packet with a
//! 6-byte record: source address followed by the data length.

use crate::checksum::fill_checksum;
use crate::types::Ipv4Addr;

/// ICMP protocol number in IP header
pub const ICMP_PROTOCOL: u8 = 1;

/// ICMP header size
pub const ICMP_HEADER_SIZE: usize = 8;

/// Filler bytes after the echo header
pub const PAYLOAD_SIZE: usize = 16;

/// Full echo request size as handed to the chip
pub const ECHO_PACKET_SIZE: usize = ICMP_HEADER_SIZE + PAYLOAD_SIZE;

/// First payload byte (ASCII space), incremented for each following byte
pub const PAYLOAD_START: u8 = 0x20;

/// Per-packet receive prefix written by the chip in raw IP mode
pub const RAW_IP_PREFIX_SIZE: usize = 6;

/// Offset of the checksum field inside the ICMP header
const CHECKSUM_OFFSET: usize = 2;

/// ICMP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    /// Echo Reply (type 0)
    EchoReply = 0,
    /// Destination Unreachable (type 3)
    DestUnreachable = 3,
    /// Redirect (type 5)
    Redirect = 5,
    /// Echo Request (type 8) - ping
    EchoRequest = 8,
    /// Time Exceeded (type 11)
    TimeExceeded = 11,
}

impl IcmpType {
    /// Parse from byte value
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EchoReply),
            3 => Some(Self::DestUnreachable),
            5 => Some(Self::Redirect),
            8 => Some(Self::EchoRequest),
            11 => Some(Self::TimeExceeded),
            _ => None,
        }
    }
}

/// Echo header fields, host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

impl EchoHeader {
    /// Header of an echo request with a zero checksum placeholder.
    pub const fn request(identifier: u16, sequence: u16) -> Self {
        Self {
            icmp_type: IcmpType::EchoRequest as u8,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
        }
    }

    /// Parse the first [`ICMP_HEADER_SIZE`] bytes of `data`.
    ///
    /// Returns `None` if `data` is shorter than a header.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let header = data.get(..ICMP_HEADER_SIZE)?;

        Some(Self {
            icmp_type: header[0],
            code: header[1],
            checksum: u16::from_be_bytes([header[2], header[3]]),
            identifier: u16::from_be_bytes([header[4], header[5]]),
            sequence: u16::from_be_bytes([header[6], header[7]]),
        })
    }

    /// Write the header in network byte order.
    ///
    /// # Panics
    /// Panics if `buffer` is shorter than [`ICMP_HEADER_SIZE`].
    pub fn write(&self, buffer: &mut [u8]) {
        let header = &mut buffer[..ICMP_HEADER_SIZE];
        header[0] = self.icmp_type;
        header[1] = self.code;
        header[2..4].copy_from_slice(&self.checksum.to_be_bytes());
        header[4..6].copy_from_slice(&self.identifier.to_be_bytes());
        header[6..8].copy_from_slice(&self.sequence.to_be_bytes());
    }

    /// Message type, `None` for types this crate does not name.
    pub const fn kind(&self) -> Option<IcmpType> {
        IcmpType::from_u8(self.icmp_type)
    }

    /// True if this is the echo reply answering `identifier`/`sequence`.
    pub fn answers(&self, identifier: u16, sequence: u16) -> bool {
        self.kind() == Some(IcmpType::EchoReply)
            && self.identifier == identifier
            && self.sequence == sequence
    }
}

/// Build a complete echo request, checksum included.
pub fn build_echo_request(identifier: u16, sequence: u16) -> [u8; ECHO_PACKET_SIZE] {
    let mut packet = [0u8; ECHO_PACKET_SIZE];

    EchoHeader::request(identifier, sequence).write(&mut packet);

    for (i, byte) in packet[ICMP_HEADER_SIZE..].iter_mut().enumerate() {
        *byte = PAYLOAD_START.wrapping_add(i as u8);
    }

    fill_checksum(&mut packet, CHECKSUM_OFFSET);
    packet
}

/// The chip's receive record preceding each raw IP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawIpPrefix {
    /// Sender of the packet
    pub source: Ipv4Addr,
    /// Bytes of ICMP data following the prefix
    pub data_len: u16,
}

impl RawIpPrefix {
    /// Parse a prefix, `None` if `data` is too short.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let prefix = data.get(..RAW_IP_PREFIX_SIZE)?;

        Some(Self {
            source: Ipv4Addr::new(prefix[0], prefix[1], prefix[2], prefix[3]),
            data_len: u16::from_be_bytes([prefix[4], prefix[5]]),
        })
    }

    /// Total bytes this record occupies in the receive buffer.
    pub const fn record_len(&self) -> u16 {
        (RAW_IP_PREFIX_SIZE as u16).wrapping_add(self.data_len)
    }
}
