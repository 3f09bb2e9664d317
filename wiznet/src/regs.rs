//! Register map shared by the W5100 and W5200.
//!
//! Common registers sit at the bottom of the address space; each socket
//! has a 0x100-byte block whose base depends on the chip.
//!
//! # Reference
//! WIZnet W5100 Datasheet v1.2.4 §3-4, W5200 Datasheet v1.4.0 §3-4

// ═══════════════════════════════════════════════════════════════════════════
// COMMON REGISTERS
// ═══════════════════════════════════════════════════════════════════════════

/// Mode register.
pub const MR: u16 = 0x0000;
/// Gateway address (4 bytes).
pub const GAR: u16 = 0x0001;
/// Subnet mask (4 bytes).
pub const SUBR: u16 = 0x0005;
/// Source hardware address (6 bytes).
pub const SHAR: u16 = 0x0009;
/// Source IP address (4 bytes).
pub const SIPR: u16 = 0x000F;
/// Retry time, 100 µs units (2 bytes).
pub const RTR: u16 = 0x0017;
/// Retry count.
pub const RCR: u16 = 0x0019;

/// MR: software reset, self-clearing.
pub const MR_RST: u8 = 0x80;

// ═══════════════════════════════════════════════════════════════════════════
// SOCKET REGISTERS (offsets inside a socket block)
// ═══════════════════════════════════════════════════════════════════════════

pub const SN_MR: u16 = 0x00;
pub const SN_CR: u16 = 0x01;
pub const SN_IR: u16 = 0x02;
pub const SN_SR: u16 = 0x03;
pub const SN_PORT: u16 = 0x04;
pub const SN_DIPR: u16 = 0x0C;
pub const SN_DPORT: u16 = 0x10;
pub const SN_PROTO: u16 = 0x14;
pub const SN_TTL: u16 = 0x16;
/// W5200 only: receive buffer size in KiB.
pub const SN_RXMEM_SIZE: u16 = 0x1E;
/// W5200 only: transmit buffer size in KiB.
pub const SN_TXMEM_SIZE: u16 = 0x1F;
pub const SN_TX_FSR: u16 = 0x20;
pub const SN_TX_RD: u16 = 0x22;
pub const SN_TX_WR: u16 = 0x24;
pub const SN_RX_RSR: u16 = 0x26;
pub const SN_RX_RD: u16 = 0x28;

/// Sn_MR protocol: raw IP.
pub const SN_MR_IPRAW: u8 = 0x03;

/// Sn_CR commands. The chip clears the register once accepted.
pub mod cmd {
    pub const OPEN: u8 = 0x01;
    pub const CLOSE: u8 = 0x10;
    pub const SEND: u8 = 0x20;
    pub const RECV: u8 = 0x40;
}
