//! ICMP Ping Engine
//!
//! A no_std ICMP echo implementation for Ethernet offload chips that
//! expose hardware sockets (WIZnet W5100/W5200 and alikes). The chip
//! handles ARP and IP; this crate builds echo requests, drives one raw IP
//! socket through [`SocketRegisters`] and correlates the reply.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Ping Engine Structure                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌───────────┐  │
//! │  │  Checksum  │  │   Packet   │  │   Socket   │  │  Pinger   │  │
//! │  │            │  │  Builder   │  │ Allocator  │  │  Session  │  │
//! │  │ RFC 1071   │  │            │  │            │  │           │  │
//! │  │ byte order │  │ build_req  │  │ acquire    │  │ sequence  │  │
//! │  │            │  │ parse_hdr  │  │ free slot  │  │ retries   │  │
//! │  └────────────┘  └────────────┘  └────────────┘  └───────────┘  │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use prodino_ping::{Ipv4Addr, Pinger, PingStatus};
//!
//! let mut pinger = Pinger::new(chip, clock);
//!
//! let reply = pinger.ping(Ipv4Addr::new(192, 168, 1, 1), 0x0400, 3);
//! if reply.status == PingStatus::Success {
//!     println!("Reply from {}: ttl={} time={}ms", reply.source, reply.ttl, reply.round_trip_time_ms);
//! }
//! ```

#![no_std]
#![forbid(unsafe_code)]

#[cfg(any(test, feature = "std"))]
extern crate std;

mod allocator;
mod checksum;
mod clock;
mod packet;
mod pinger;
mod shared;
mod socket;
mod types;

#[cfg(test)]
mod mock;

pub use allocator::acquire_free_socket;
pub use checksum::{
    calculate_checksum, fill_checksum, finalize_checksum, from_network_order16,
    partial_checksum, to_network_order16, verify_checksum,
};
pub use clock::Clock;
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use packet::{
    build_echo_request, EchoHeader, IcmpType, RawIpPrefix, ECHO_PACKET_SIZE, ICMP_HEADER_SIZE,
    ICMP_PROTOCOL, PAYLOAD_SIZE, PAYLOAD_START, RAW_IP_PREFIX_SIZE,
};
pub use pinger::{EchoProbe, Pinger};
pub use shared::SharedPinger;
pub use socket::{InterruptFlags, SocketHandle, SocketRegisters, SocketStatus};
pub use types::{EchoReply, Ipv4Addr, PingConfig, PingStats, PingStatus};

/// Identifier Windows `ping` uses, handy when a firewall only passes those
pub const WINDOWS_PING_ID: u16 = 0x0400;
