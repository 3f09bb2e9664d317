//! Core Types for Ping Engine

use core::fmt;

/// IPv4 address (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ipv4Addr(pub [u8; 4]);

impl Ipv4Addr {
    /// Create a new IPv4 address
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self([a, b, c, d])
    }

    /// Create from u32 (network byte order)
    pub const fn from_u32(addr: u32) -> Self {
        Self(addr.to_be_bytes())
    }

    /// Convert to u32 (network byte order)
    pub const fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Unspecified address (0.0.0.0)
    pub const UNSPECIFIED: Self = Self([0, 0, 0, 0]);

    /// Check if unspecified
    pub const fn is_unspecified(&self) -> bool {
        self.to_u32() == 0
    }

    /// Get octets
    pub const fn octets(&self) -> [u8; 4] {
        self.0
    }
}

impl From<[u8; 4]> for Ipv4Addr {
    fn from(octets: [u8; 4]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Ping engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingConfig {
    /// Reply wait per attempt, measured from the end of transmission
    pub reply_timeout_ms: u32,
    /// TTL written to the socket for outgoing requests
    pub ttl: u8,
    /// Give up on a transmission the chip neither completes nor times out
    pub send_guard_ms: u32,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl PingConfig {
    /// 1 s reply timeout, TTL 255
    pub const fn standard() -> Self {
        Self {
            reply_timeout_ms: 1000,
            ttl: 255,
            send_guard_ms: 2000,
        }
    }

    /// Short timeout for hosts on the local segment
    pub const fn quick() -> Self {
        Self {
            reply_timeout_ms: 250,
            ttl: 64,
            send_guard_ms: 500,
        }
    }

    /// Worst-case blocking time of one ping call with `retries` attempts
    pub const fn worst_case_ms(&self, retries: u32) -> u64 {
        let attempts = if retries == 0 { 1 } else { retries };
        attempts as u64 * (self.send_guard_ms as u64 + self.reply_timeout_ms as u64)
    }
}

/// Outcome of a ping call.
///
/// These describe failures of the engine or the chip, not anything defined
/// by ICMP itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingStatus {
    /// A matching echo reply arrived.
    Success,
    /// The chip did not complete the transmission.
    SendTimeout,
    /// Nothing arrived before the reply deadline.
    NoResponse,
    /// Only non-matching or truncated packets arrived before the deadline.
    BadResponse,
    /// Every hardware socket was busy when the call started.
    NoFreeSocket,
}

impl PingStatus {
    /// True only for [`PingStatus::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for PingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::SendTimeout => write!(f, "send timeout"),
            Self::NoResponse => write!(f, "no response"),
            Self::BadResponse => write!(f, "bad response"),
            Self::NoFreeSocket => write!(f, "no free socket"),
        }
    }
}

/// Result of one ping call, returned by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    /// Outcome of the last attempt
    pub status: PingStatus,
    /// Address the reply came from (unspecified unless successful)
    pub source: Ipv4Addr,
    /// TTL of the reply as seen by the chip
    pub ttl: u8,
    /// Milliseconds from socket setup to completion, whatever the outcome
    pub round_trip_time_ms: u32,
    /// Sequence number of the last request sent
    pub sequence: u16,
}

impl EchoReply {
    /// Fresh reply carrying only a status.
    pub const fn new(status: PingStatus) -> Self {
        Self {
            status,
            source: Ipv4Addr::UNSPECIFIED,
            ttl: 0,
            round_trip_time_ms: 0,
            sequence: 0,
        }
    }
}

/// Statistics across every attempt made by one engine
#[derive(Debug, Clone, Copy)]
pub struct PingStats {
    /// Total requests sent
    pub sent: u32,
    /// Requests answered with a matching reply
    pub received: u32,
    /// Requests lost (timeout or error)
    pub lost: u32,
    /// Minimum RTT (ms)
    pub min_rtt_ms: u32,
    /// Maximum RTT (ms)
    pub max_rtt_ms: u32,
    /// Sum of all RTTs (for average calculation)
    rtt_sum_ms: u64,
}

impl Default for PingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PingStats {
    /// Create new empty stats
    pub const fn new() -> Self {
        Self {
            sent: 0,
            received: 0,
            lost: 0,
            min_rtt_ms: u32::MAX,
            max_rtt_ms: 0,
            rtt_sum_ms: 0,
        }
    }

    /// Record a sent packet
    pub fn record_sent(&mut self) {
        self.sent = self.sent.saturating_add(1);
    }

    /// Record a successful reply
    pub fn record_reply(&mut self, rtt_ms: u32) {
        self.received = self.received.saturating_add(1);
        self.rtt_sum_ms = self.rtt_sum_ms.saturating_add(rtt_ms as u64);
        self.min_rtt_ms = self.min_rtt_ms.min(rtt_ms);
        self.max_rtt_ms = self.max_rtt_ms.max(rtt_ms);
    }

    /// Record a lost packet
    pub fn record_lost(&mut self) {
        self.lost = self.lost.saturating_add(1);
    }

    /// Calculate packet loss percentage
    pub const fn loss_percent(&self) -> u32 {
        if self.sent == 0 {
            100
        } else {
            (self.lost as u64 * 100 / self.sent as u64) as u32
        }
    }

    /// Calculate average RTT (ms)
    pub const fn avg_rtt_ms(&self) -> u32 {
        if self.received == 0 {
            0
        } else {
            (self.rtt_sum_ms / self.received as u64) as u32
        }
    }

    /// Check if any connectivity exists
    pub const fn has_connectivity(&self) -> bool {
        self.received > 0
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
