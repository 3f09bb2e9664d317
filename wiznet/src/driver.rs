//! Socket register driver for WIZnet chips.
//!
//! Implements [`SocketRegisters`] on top of an `embedded-hal` SPI device.

use core::marker::PhantomData;

use embedded_hal::spi::SpiDevice;
use log::{debug, error, warn};
use prodino_ping::{InterruptFlags, Ipv4Addr, SocketHandle, SocketRegisters, SocketStatus};

use crate::regs::{self, cmd};
use crate::variant::Variant;

/// Reads of a self-clearing register before giving up on it.
const POLL_LIMIT: u32 = 1000;

/// Addressing written to the common registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub mac: [u8; 6],
    pub ip: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub subnet: Ipv4Addr,
    /// Retransmission timeout in 100 µs units
    pub retry_time: u16,
    /// Retransmissions before the chip raises TIMEOUT
    pub retry_count: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac: [0x80, 0x9B, 0x20, 0x54, 0x64, 0x68],
            ip: Ipv4Addr::new(192, 168, 1, 199),
            gateway: Ipv4Addr::new(192, 168, 1, 1),
            subnet: Ipv4Addr::new(255, 255, 255, 0),
            retry_time: 2000,
            retry_count: 8,
        }
    }
}

/// Driver init errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError<E> {
    /// SPI transfer failed.
    Bus(E),
    /// Soft reset bit never cleared.
    ResetTimeout,
}

impl<E> From<E> for InitError<E> {
    fn from(err: E) -> Self {
        InitError::Bus(err)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for InitError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(err) => write!(f, "SPI bus error: {:?}", err),
            Self::ResetTimeout => write!(f, "chip did not leave reset"),
        }
    }
}

/// WIZnet chip on an SPI bus.
pub struct Wiznet<SPI: SpiDevice, V: Variant> {
    spi: SPI,
    /// First bus failure since the last `take_bus_error`.
    bus_error: Option<SPI::Error>,
    _variant: PhantomData<V>,
}

impl<SPI: SpiDevice, V: Variant> Wiznet<SPI, V> {
    /// Wrap an SPI device without touching the chip.
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            bus_error: None,
            _variant: PhantomData,
        }
    }

    /// Reset the chip, size the socket buffers and program addressing.
    pub fn init(&mut self, config: &NetworkConfig) -> Result<(), InitError<SPI::Error>> {
        V::write(&mut self.spi, regs::MR, &[regs::MR_RST])?;

        let mut mode = [regs::MR_RST];
        for _ in 0..POLL_LIMIT {
            V::read(&mut self.spi, regs::MR, &mut mode)?;
            if mode[0] & regs::MR_RST == 0 {
                break;
            }
        }
        if mode[0] & regs::MR_RST != 0 {
            return Err(InitError::ResetTimeout);
        }

        V::init_buffers(&mut self.spi)?;
        V::write(&mut self.spi, regs::SHAR, &config.mac)?;
        V::write(&mut self.spi, regs::SIPR, &config.ip.octets())?;
        V::write(&mut self.spi, regs::GAR, &config.gateway.octets())?;
        V::write(&mut self.spi, regs::SUBR, &config.subnet.octets())?;
        V::write(&mut self.spi, regs::RTR, &config.retry_time.to_be_bytes())?;
        V::write(&mut self.spi, regs::RCR, &[config.retry_count])?;

        debug!("{} up: ip={} gw={} mask={}", V::NAME, config.ip, config.gateway, config.subnet);
        Ok(())
    }

    /// First SPI error seen since the previous call, if any.
    ///
    /// Register accesses that failed read back as zero.
    pub fn take_bus_error(&mut self) -> Option<SPI::Error> {
        self.bus_error.take()
    }

    /// Give the SPI device back.
    pub fn release(self) -> SPI {
        self.spi
    }

    // ───────────────────────────────────────────────────────────────────────
    // Raw access
    // ───────────────────────────────────────────────────────────────────────

    fn fault(&mut self, err: SPI::Error) {
        error!("{} bus error: {:?}", V::NAME, err);
        if self.bus_error.is_none() {
            self.bus_error = Some(err);
        }
    }

    fn read_bytes(&mut self, addr: u16, buffer: &mut [u8]) {
        if let Err(err) = V::read(&mut self.spi, addr, buffer) {
            buffer.fill(0);
            self.fault(err);
        }
    }

    fn write_bytes(&mut self, addr: u16, data: &[u8]) {
        if let Err(err) = V::write(&mut self.spi, addr, data) {
            self.fault(err);
        }
    }

    fn read_socket_u8(&mut self, socket: SocketHandle, offset: u16) -> u8 {
        let mut value = [0u8; 1];
        self.read_bytes(V::socket_register(socket.0, offset), &mut value);
        value[0]
    }

    fn write_socket_u8(&mut self, socket: SocketHandle, offset: u16, value: u8) {
        self.write_bytes(V::socket_register(socket.0, offset), &[value]);
    }

    fn read_socket_u16(&mut self, socket: SocketHandle, offset: u16) -> u16 {
        let mut value = [0u8; 2];
        self.read_bytes(V::socket_register(socket.0, offset), &mut value);
        u16::from_be_bytes(value)
    }

    fn write_socket_u16(&mut self, socket: SocketHandle, offset: u16, value: u16) {
        self.write_bytes(V::socket_register(socket.0, offset), &value.to_be_bytes());
    }

    /// 16-bit counters can change between the two byte reads; read until
    /// two consecutive values agree.
    fn read_socket_u16_stable(&mut self, socket: SocketHandle, offset: u16) -> u16 {
        let mut previous = self.read_socket_u16(socket, offset);
        for _ in 0..POLL_LIMIT {
            let current = self.read_socket_u16(socket, offset);
            if current == previous {
                return current;
            }
            previous = current;
        }
        previous
    }

    /// Issue a socket command and wait for the chip to accept it.
    fn command(&mut self, socket: SocketHandle, command: u8) {
        self.write_socket_u8(socket, regs::SN_CR, command);

        for _ in 0..POLL_LIMIT {
            if self.read_socket_u8(socket, regs::SN_CR) == 0 {
                return;
            }
        }
        warn!("{} socket {}: command {:#04x} not accepted", V::NAME, socket.0, command);
    }

    /// Copy `data` into a socket ring buffer starting at ring offset `offset`.
    fn write_ring(&mut self, base: u16, offset: u16, data: &[u8]) {
        let mask = V::BUFFER_SIZE - 1;
        let start = offset & mask;
        let first = data.len().min((V::BUFFER_SIZE - start) as usize);

        self.write_bytes(base + start, &data[..first]);
        if first < data.len() {
            self.write_bytes(base, &data[first..]);
        }
    }

    fn read_ring(&mut self, base: u16, offset: u16, buffer: &mut [u8]) {
        let mask = V::BUFFER_SIZE - 1;
        let start = offset & mask;
        let first = buffer.len().min((V::BUFFER_SIZE - start) as usize);

        let (head, tail) = buffer.split_at_mut(first);
        self.read_bytes(base + start, head);
        if !tail.is_empty() {
            self.read_bytes(base, tail);
        }
    }
}

impl<SPI: SpiDevice, V: Variant> SocketRegisters for Wiznet<SPI, V> {
    fn socket_count(&self) -> u8 {
        V::SOCKET_COUNT
    }

    fn socket_status(&mut self, socket: SocketHandle) -> SocketStatus {
        SocketStatus::from_u8(self.read_socket_u8(socket, regs::SN_SR))
    }

    fn open(&mut self, socket: SocketHandle) {
        self.command(socket, cmd::OPEN);
    }

    fn close(&mut self, socket: SocketHandle) {
        self.command(socket, cmd::CLOSE);
    }

    fn interrupt_flags(&mut self, socket: SocketHandle) -> InterruptFlags {
        InterruptFlags::from_bits_truncate(self.read_socket_u8(socket, regs::SN_IR))
    }

    fn clear_interrupt_flags(&mut self, socket: SocketHandle, mask: u8) {
        self.write_socket_u8(socket, regs::SN_IR, mask);
    }

    fn configure_raw_ip(&mut self, socket: SocketHandle, protocol: u8) {
        self.write_socket_u8(socket, regs::SN_MR, regs::SN_MR_IPRAW);
        self.write_socket_u8(socket, regs::SN_PROTO, protocol);
        self.write_socket_u16(socket, regs::SN_PORT, 0);
    }

    fn set_destination_address(&mut self, socket: SocketHandle, addr: Ipv4Addr) {
        self.write_bytes(V::socket_register(socket.0, regs::SN_DIPR), &addr.octets());
    }

    fn set_destination_port(&mut self, socket: SocketHandle, port: u16) {
        self.write_socket_u16(socket, regs::SN_DPORT, port);
    }

    fn set_ttl(&mut self, socket: SocketHandle, ttl: u8) {
        self.write_socket_u8(socket, regs::SN_TTL, ttl);
    }

    /// Queue `data` once the chip has room for all of it. If room never
    /// appears nothing is written, and the following SEND goes out empty.
    fn send_data(&mut self, socket: SocketHandle, data: &[u8]) {
        let mut free = 0;
        for _ in 0..POLL_LIMIT {
            free = self.read_socket_u16_stable(socket, regs::SN_TX_FSR) as usize;
            if free >= data.len() {
                break;
            }
        }
        if free < data.len() {
            warn!("{} socket {}: {} bytes dropped, {} free", V::NAME, socket.0, data.len(), free);
            return;
        }

        let wr = self.read_socket_u16(socket, regs::SN_TX_WR);
        self.write_ring(V::tx_buffer(socket.0), wr, data);
        self.write_socket_u16(socket, regs::SN_TX_WR, wr.wrapping_add(data.len() as u16));
    }

    fn issue_send(&mut self, socket: SocketHandle) {
        self.command(socket, cmd::SEND);
    }

    fn received_byte_count(&mut self, socket: SocketHandle) -> u16 {
        self.read_socket_u16_stable(socket, regs::SN_RX_RSR)
    }

    fn read_pointer(&mut self, socket: SocketHandle) -> u16 {
        self.read_socket_u16(socket, regs::SN_RX_RD)
    }

    fn read_receive_buffer(&mut self, socket: SocketHandle, offset: u16, buffer: &mut [u8]) -> usize {
        let rd = self.read_pointer(socket);
        let held = self.received_byte_count(socket);
        let available = held.saturating_sub(offset.wrapping_sub(rd)) as usize;
        let n = buffer.len().min(available);

        self.read_ring(V::rx_buffer(socket.0), offset, &mut buffer[..n]);
        n
    }

    fn advance_read_pointer(&mut self, socket: SocketHandle, offset: u16) {
        self.write_socket_u16(socket, regs::SN_RX_RD, offset);
    }

    fn issue_receive(&mut self, socket: SocketHandle) {
        self.command(socket, cmd::RECV);
    }

    fn ttl(&mut self, socket: SocketHandle) -> u8 {
        self.read_socket_u8(socket, regs::SN_TTL)
    }
}
