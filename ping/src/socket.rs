//! Hardware socket register interface.
//!
//! The ping engine drives one socket slot of an Ethernet offload chip
//! through this trait. Chip adapters translate each call into register
//! accesses on their own bus.

use bitflags::bitflags;

use crate::types::Ipv4Addr;

/// Index of one hardware socket slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SocketHandle(pub u8);

impl SocketHandle {
    /// Slot index as usize.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Socket status register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStatus {
    Closed,
    Init,
    Listen,
    SynSent,
    SynRecv,
    Established,
    FinWait,
    Closing,
    TimeWait,
    CloseWait,
    LastAck,
    Udp,
    IpRaw,
    MacRaw,
    /// Any code not listed above.
    Other(u8),
}

impl SocketStatus {
    /// Decode a status register byte
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Closed,
            0x13 => Self::Init,
            0x14 => Self::Listen,
            0x15 => Self::SynSent,
            0x16 => Self::SynRecv,
            0x17 => Self::Established,
            0x18 => Self::FinWait,
            0x1A => Self::Closing,
            0x1B => Self::TimeWait,
            0x1C => Self::CloseWait,
            0x1D => Self::LastAck,
            0x22 => Self::Udp,
            0x32 => Self::IpRaw,
            0x42 => Self::MacRaw,
            other => Self::Other(other),
        }
    }

    /// Encode back to the register byte
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Closed => 0x00,
            Self::Init => 0x13,
            Self::Listen => 0x14,
            Self::SynSent => 0x15,
            Self::SynRecv => 0x16,
            Self::Established => 0x17,
            Self::FinWait => 0x18,
            Self::Closing => 0x1A,
            Self::TimeWait => 0x1B,
            Self::CloseWait => 0x1C,
            Self::LastAck => 0x1D,
            Self::Udp => 0x22,
            Self::IpRaw => 0x32,
            Self::MacRaw => 0x42,
            Self::Other(code) => *code,
        }
    }

    /// Slot can be taken over for a new session.
    pub const fn is_reclaimable(&self) -> bool {
        matches!(self, Self::Closed | Self::FinWait | Self::CloseWait)
    }
}

bitflags! {
    /// Socket interrupt register bits.
    ///
    /// Writing a bit back to the register clears it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptFlags: u8 {
        const CON = 0x01;
        const DISCON = 0x02;
        const RECV = 0x04;
        const TIMEOUT = 0x08;
        const SEND_OK = 0x10;
    }
}

impl InterruptFlags {
    /// Mask that clears every bit, including ones this type does not name.
    pub const CLEAR_ALL: u8 = 0xFF;
}

/// Register-level access to the socket slots of an offload chip.
///
/// All calls are synchronous bus transactions. The caller owns the chip
/// exclusively while a ping is in progress.
pub trait SocketRegisters {
    /// Number of socket slots on this chip.
    fn socket_count(&self) -> u8;

    /// Read the status register.
    fn socket_status(&mut self, socket: SocketHandle) -> SocketStatus;

    /// Issue the OPEN command.
    fn open(&mut self, socket: SocketHandle);

    /// Issue the CLOSE command.
    fn close(&mut self, socket: SocketHandle);

    /// Read the interrupt register.
    fn interrupt_flags(&mut self, socket: SocketHandle) -> InterruptFlags;

    /// Clear interrupt bits by writing `mask` to the interrupt register.
    fn clear_interrupt_flags(&mut self, socket: SocketHandle, mask: u8);

    /// Put the socket into raw IP mode for `protocol`.
    fn configure_raw_ip(&mut self, socket: SocketHandle, protocol: u8);

    /// Set the destination IP register.
    fn set_destination_address(&mut self, socket: SocketHandle, addr: Ipv4Addr);

    /// Set the destination port register.
    fn set_destination_port(&mut self, socket: SocketHandle, port: u16);

    /// Set the TTL used for outgoing packets.
    fn set_ttl(&mut self, socket: SocketHandle, ttl: u8);

    /// Copy `data` into the transmit buffer and advance the write pointer.
    fn send_data(&mut self, socket: SocketHandle, data: &[u8]);

    /// Issue the SEND command for everything queued by `send_data`.
    fn issue_send(&mut self, socket: SocketHandle);

    /// Bytes waiting in the receive buffer.
    fn received_byte_count(&mut self, socket: SocketHandle) -> u16;

    /// Current receive read pointer.
    fn read_pointer(&mut self, socket: SocketHandle) -> u16;

    /// Copy receive buffer bytes starting at read pointer value `offset`.
    ///
    /// Returns how many bytes were produced, which is less than
    /// `buffer.len()` when the chip holds fewer.
    fn read_receive_buffer(&mut self, socket: SocketHandle, offset: u16, buffer: &mut [u8]) -> usize;

    /// Move the receive read pointer to `offset`.
    fn advance_read_pointer(&mut self, socket: SocketHandle, offset: u16);

    /// Issue the RECV command, telling the chip the consumed bytes are free.
    fn issue_receive(&mut self, socket: SocketHandle);

    /// TTL register, which reflects the most recently received packet.
    fn ttl(&mut self, socket: SocketHandle) -> u8;
}
