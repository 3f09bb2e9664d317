//! Pinger - echo session engine
//!
//! One call to [`Pinger::ping`] runs a complete session:
//!
//! ```text
//! Idle ─► SocketAcquired ─► Sending ─► AwaitingReply ─► Matched ─┐
//!   │                          ▲  │           │                  │
//!   │                          │  └► SendFailed┤                  ▼
//!   │                          └── retry ◄────┴─ TimedOut    SocketReleased ─► Done
//!   └─ no free socket ─────────────────────────────────────────────────────────► Done
//! ```

use log::{debug, trace, warn};

use crate::allocator::acquire_free_socket;
use crate::clock::Clock;
use crate::packet::{
    build_echo_request, EchoHeader, RawIpPrefix, ICMP_HEADER_SIZE, ICMP_PROTOCOL,
    RAW_IP_PREFIX_SIZE,
};
use crate::socket::{InterruptFlags, SocketHandle, SocketRegisters};
use crate::types::{EchoReply, Ipv4Addr, PingConfig, PingStats, PingStatus};

/// Anything that can answer "is this host alive".
pub trait EchoProbe {
    /// Ping `target` with up to `retries` attempts.
    fn ping(&mut self, target: Ipv4Addr, identifier: u16, retries: u32) -> EchoReply;
}

/// Stateful ICMP echo engine bound to one chip.
#[derive(Debug)]
pub struct Pinger<R, C> {
    regs: R,
    clock: C,
    config: PingConfig,
    /// Sequence of the last request sent; never reset
    sequence: u16,
    stats: PingStats,
}

impl<R: SocketRegisters, C: Clock> Pinger<R, C> {
    /// Create a pinger with the default configuration
    pub fn new(regs: R, clock: C) -> Self {
        Self::with_config(regs, clock, PingConfig::default())
    }

    /// Create a pinger with an explicit configuration
    pub fn with_config(regs: R, clock: C, config: PingConfig) -> Self {
        Self {
            regs,
            clock,
            config,
            sequence: 0,
            stats: PingStats::new(),
        }
    }

    /// Get current configuration
    pub const fn config(&self) -> &PingConfig {
        &self.config
    }

    /// Sequence number of the most recent request
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Get statistics
    pub const fn stats(&self) -> &PingStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Direct access to the chip, e.g. for diagnostics between pings
    pub fn registers(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Give back the register bank and clock
    pub fn into_parts(self) -> (R, C) {
        (self.regs, self.clock)
    }

    /// Ping `target`.
    ///
    /// # Arguments
    /// * `target` - Host to ping
    /// * `identifier` - Echo identifier the reply must carry
    /// * `retries` - Attempts before giving up (at least one is made)
    ///
    /// # Returns
    /// The reply; `status` holds the outcome of the last attempt. The
    /// acquired socket is closed again before this returns.
    pub fn ping(&mut self, target: Ipv4Addr, identifier: u16, retries: u32) -> EchoReply {
        let Some(socket) = acquire_free_socket(&mut self.regs) else {
            warn!("ping {}: no free socket", target);
            return EchoReply::new(PingStatus::NoFreeSocket);
        };

        let started = self.clock.now_ms();
        let mut lease = SocketLease::open(&mut self.regs, socket, target, self.config.ttl);
        let mut reply = EchoReply::new(PingStatus::NoResponse);

        for attempt in 1..=retries.max(1) {
            self.sequence = self.sequence.wrapping_add(1);
            reply.sequence = self.sequence;

            let packet = build_echo_request(identifier, self.sequence);
            let attempt_started = self.clock.now_ms();
            self.stats.record_sent();

            reply.status = match lease.transmit(&packet, &self.clock, self.config.send_guard_ms) {
                PingStatus::Success => {
                    match lease.await_reply(&self.clock, identifier, self.sequence, self.config.reply_timeout_ms) {
                        Ok(source) => {
                            reply.source = source;
                            reply.ttl = lease.reply_ttl();
                            PingStatus::Success
                        }
                        Err(status) => status,
                    }
                }
                failed => failed,
            };

            debug!(
                "ping {} id={:#06x} seq={} attempt {}/{}: {}",
                target, identifier, self.sequence, attempt, retries.max(1), reply.status
            );

            if reply.status.is_success() {
                self.stats.record_reply(self.clock.elapsed_since(attempt_started));
                break;
            }
            self.stats.record_lost();
        }

        reply.round_trip_time_ms = self.clock.elapsed_since(started);
        reply
    }
}

impl<R: SocketRegisters, C: Clock> EchoProbe for Pinger<R, C> {
    fn ping(&mut self, target: Ipv4Addr, identifier: u16, retries: u32) -> EchoReply {
        Pinger::ping(self, target, identifier, retries)
    }
}

/// A socket held for the duration of one session.
///
/// Dropping the lease closes the socket and clears its interrupt flags,
/// whatever path the session left by.
struct SocketLease<'a, R: SocketRegisters> {
    regs: &'a mut R,
    socket: SocketHandle,
}

impl<'a, R: SocketRegisters> SocketLease<'a, R> {
    /// Configure `socket` for raw ICMP to `target` and open it.
    fn open(regs: &'a mut R, socket: SocketHandle, target: Ipv4Addr, ttl: u8) -> Self {
        regs.close(socket);
        regs.clear_interrupt_flags(socket, InterruptFlags::CLEAR_ALL);
        regs.configure_raw_ip(socket, ICMP_PROTOCOL);
        regs.open(socket);

        regs.set_destination_address(socket, target);
        // ICMP has no ports
        regs.set_destination_port(socket, 0);
        regs.set_ttl(socket, ttl);

        Self { regs, socket }
    }

    /// Hand `packet` to the chip and wait for it to leave.
    fn transmit<C: Clock>(&mut self, packet: &[u8], clock: &C, guard_ms: u32) -> PingStatus {
        let socket = self.socket;
        self.regs.send_data(socket, packet);
        self.regs.issue_send(socket);

        let started = clock.now_ms();
        loop {
            let flags = self.regs.interrupt_flags(socket);

            if flags.contains(InterruptFlags::SEND_OK) {
                self.regs.clear_interrupt_flags(socket, InterruptFlags::SEND_OK.bits());
                return PingStatus::Success;
            }

            if flags.contains(InterruptFlags::TIMEOUT) || clock.elapsed_since(started) >= guard_ms {
                let mask = InterruptFlags::SEND_OK | InterruptFlags::TIMEOUT;
                self.regs.clear_interrupt_flags(socket, mask.bits());
                return PingStatus::SendTimeout;
            }
        }
    }

    /// Poll until the reply to `identifier`/`sequence` arrives or the
    /// deadline passes. Returns the replying address.
    fn await_reply<C: Clock>(
        &mut self,
        clock: &C,
        identifier: u16,
        sequence: u16,
        timeout_ms: u32,
    ) -> Result<Ipv4Addr, PingStatus> {
        let started = clock.now_ms();
        let mut filtered = false;

        while clock.elapsed_since(started) < timeout_ms {
            if self.regs.received_byte_count(self.socket) == 0 {
                continue;
            }

            match self.read_record() {
                Some((prefix, header)) if header.answers(identifier, sequence) => {
                    return Ok(prefix.source);
                }
                Some((prefix, header)) => {
                    match header.kind() {
                        Some(kind) => trace!(
                            "ignoring icmp {:?} id={:#06x} seq={} from {}",
                            kind, header.identifier, header.sequence, prefix.source
                        ),
                        None => trace!(
                            "ignoring icmp type={} from {}",
                            header.icmp_type, prefix.source
                        ),
                    }
                    filtered = true;
                }
                None => {
                    trace!("ignoring truncated receive record");
                    filtered = true;
                }
            }
        }

        Err(if filtered {
            PingStatus::BadResponse
        } else {
            PingStatus::NoResponse
        })
    }

    /// Consume one receive record, inspecting only its echo header.
    ///
    /// The read pointer is always committed past the record (payload
    /// included) so the next poll sees the following packet. `None` if the
    /// chip produced fewer bytes than a prefix plus header.
    fn read_record(&mut self) -> Option<(RawIpPrefix, EchoHeader)> {
        let socket = self.socket;
        let pending = self.regs.received_byte_count(socket);
        let rd = self.regs.read_pointer(socket);

        let mut raw = [0u8; RAW_IP_PREFIX_SIZE];
        let prefix = if self.regs.read_receive_buffer(socket, rd, &mut raw) == RAW_IP_PREFIX_SIZE {
            RawIpPrefix::parse(&raw)
        } else {
            None
        };

        let Some(prefix) = prefix else {
            // Record length unknown: drop everything held
            self.consume(rd, pending);
            return None;
        };

        let mut header = [0u8; ICMP_HEADER_SIZE];
        let wanted = (prefix.data_len as usize).min(ICMP_HEADER_SIZE);
        let got = self.regs.read_receive_buffer(
            socket,
            rd.wrapping_add(RAW_IP_PREFIX_SIZE as u16),
            &mut header[..wanted],
        );

        self.consume(rd, prefix.record_len().min(pending));

        EchoHeader::parse(&header[..got]).map(|header| (prefix, header))
    }

    fn consume(&mut self, rd: u16, len: u16) {
        self.regs.advance_read_pointer(self.socket, rd.wrapping_add(len));
        self.regs.issue_receive(self.socket);
    }

    fn reply_ttl(&mut self) -> u8 {
        self.regs.ttl(self.socket)
    }
}

impl<R: SocketRegisters> Drop for SocketLease<'_, R> {
    fn drop(&mut self) {
        self.regs.close(self.socket);
        self.regs.clear_interrupt_flags(self.socket, InterruptFlags::CLEAR_ALL);
    }
}
