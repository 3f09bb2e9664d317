//! Simulated WIZnet chip behind a fake SPI device.
//!
//! Decodes both SPI framings into a flat 64 KiB address space and
//! emulates the register side effects the driver relies on.

use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};
use prodino_ping::{EchoHeader, IcmpType, Ipv4Addr, ECHO_PACKET_SIZE, ICMP_HEADER_SIZE};
use std::vec;
use std::vec::Vec;

use crate::regs::{self, cmd};
use crate::variant::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// W5100: `op addr_hi addr_lo data`, one byte per frame
    PerByte,
    /// W5200: `addr_hi addr_lo op|len_hi len_lo data...`
    Burst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

impl spi::Error for FakeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    socket_base: u16,
    socket_stride: u16,
    socket_count: u8,
    tx_base: u16,
    rx_base: u16,
    size: u16,
}

pub struct FakeChip {
    framing: Framing,
    layout: Layout,
    mem: Vec<u8>,
    commands: Vec<(u8, u8)>,
    rx_wr: Vec<u16>,
    auto_reply: Option<(Ipv4Addr, u8)>,
    fail_after: Option<usize>,
    transactions: usize,
    stuck_reset: bool,
    /// Reads of Sn_CR that still return the last command
    cr_latency: usize,
    cr_pending: Vec<usize>,
    /// Bytes that land in the receive ring right after the next Sn_RX_RSR read
    late_rx: Option<(u8, Vec<u8>)>,
    reads: Vec<u32>,
}

impl FakeChip {
    pub fn new<V: Variant>(framing: Framing) -> Self {
        let layout = Layout {
            socket_base: V::SOCKET_BASE,
            socket_stride: V::SOCKET_STRIDE,
            socket_count: V::SOCKET_COUNT,
            tx_base: V::TX_BASE,
            rx_base: V::RX_BASE,
            size: V::BUFFER_SIZE,
        };
        let mut chip = Self {
            framing,
            layout,
            mem: vec![0; 0x10000],
            commands: Vec::new(),
            rx_wr: vec![0; V::SOCKET_COUNT as usize],
            auto_reply: None,
            fail_after: None,
            transactions: 0,
            stuck_reset: false,
            cr_latency: 0,
            cr_pending: vec![0; V::SOCKET_COUNT as usize],
            late_rx: None,
            reads: vec![0; 0x10000],
        };
        for socket in 0..V::SOCKET_COUNT {
            chip.set16(chip.sock(socket, regs::SN_TX_FSR), V::BUFFER_SIZE);
        }
        chip
    }

    /// Answer every SEND with a matching echo reply from `source`.
    pub fn auto_reply(&mut self, source: Ipv4Addr, ttl: u8) {
        self.auto_reply = Some((source, ttl));
    }

    /// Fail every transaction after the first `n`.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(self.transactions + n);
    }

    /// Keep MR_RST set forever.
    pub fn stick_reset(&mut self) {
        self.stuck_reset = true;
    }

    /// Keep each command visible in Sn_CR for `reads` polls; `usize::MAX` never clears.
    pub fn command_latency(&mut self, reads: usize) {
        self.cr_latency = reads;
    }

    /// Deliver `data` to `socket` in the middle of the next Sn_RX_RSR read.
    pub fn late_rx(&mut self, socket: u8, data: &[u8]) {
        self.late_rx = Some((socket, data.to_vec()));
    }

    /// How often `addr` was read over the bus.
    pub fn reads(&self, addr: u16) -> u32 {
        self.reads[addr as usize]
    }

    /// Place `data` in a socket's receive ring at read pointer `rd`.
    pub fn inject_rx(&mut self, socket: u8, rd: u16, data: &[u8]) {
        self.set16(self.sock(socket, regs::SN_RX_RD), rd);
        self.rx_wr[socket as usize] = rd;
        self.push_rx(socket, data);
    }

    pub fn mem(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    pub fn slice(&self, addr: u16, len: usize) -> &[u8] {
        &self.mem[addr as usize..addr as usize + len]
    }

    /// `(socket, command)` in issue order.
    pub fn commands(&self) -> &[(u8, u8)] {
        &self.commands
    }

    fn sock(&self, socket: u8, offset: u16) -> u16 {
        self.layout.socket_base + socket as u16 * self.layout.socket_stride + offset
    }

    fn get16(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.mem(addr), self.mem(addr + 1)])
    }

    fn set16(&mut self, addr: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.mem[addr as usize] = hi;
        self.mem[addr as usize + 1] = lo;
    }

    fn ring_addr(&self, base: u16, ptr: u16) -> usize {
        (base + (ptr & (self.layout.size - 1))) as usize
    }

    fn push_rx(&mut self, socket: u8, data: &[u8]) {
        let base = self.layout.rx_base + socket as u16 * self.layout.size;
        for &byte in data {
            let addr = self.ring_addr(base, self.rx_wr[socket as usize]);
            self.mem[addr] = byte;
            self.rx_wr[socket as usize] = self.rx_wr[socket as usize].wrapping_add(1);
        }
        self.update_rsr(socket);
    }

    fn update_rsr(&mut self, socket: u8) {
        let rd = self.get16(self.sock(socket, regs::SN_RX_RD));
        let rsr = self.rx_wr[socket as usize].wrapping_sub(rd);
        self.set16(self.sock(socket, regs::SN_RX_RSR), rsr);
    }

    /// Decode an address into `(socket, offset)` if it hits a socket block.
    fn socket_of(&self, addr: u16) -> Option<(u8, u16)> {
        let end = self.layout.socket_base + self.layout.socket_count as u16 * self.layout.socket_stride;
        if addr < self.layout.socket_base || addr >= end {
            return None;
        }
        let rel = addr - self.layout.socket_base;
        Some(((rel / self.layout.socket_stride) as u8, rel % self.layout.socket_stride))
    }

    fn load(&mut self, addr: u16) -> u8 {
        self.reads[addr as usize] += 1;
        if addr == regs::MR && self.stuck_reset {
            return regs::MR_RST;
        }

        let value = self.mem(addr);
        match self.socket_of(addr) {
            Some((socket, regs::SN_CR)) => match self.cr_pending[socket as usize] {
                0 => {
                    self.mem[addr as usize] = 0;
                    return 0;
                }
                usize::MAX => {}
                _ => self.cr_pending[socket as usize] -= 1,
            },
            // Low byte ends the 16-bit read
            Some((socket, offset))
                if offset == regs::SN_RX_RSR + 1
                    && self.late_rx.as_ref().is_some_and(|(late, _)| *late == socket) =>
            {
                if let Some((late, data)) = self.late_rx.take() {
                    self.push_rx(late, &data);
                }
            }
            _ => {}
        }
        value
    }

    fn store(&mut self, addr: u16, value: u8) {
        match self.socket_of(addr) {
            Some((socket, regs::SN_CR)) => self.execute(socket, value),
            Some((_, regs::SN_IR)) => self.mem[addr as usize] &= !value,
            _ if addr == regs::MR && value & regs::MR_RST != 0 => self.mem[addr as usize] = 0,
            _ => self.mem[addr as usize] = value,
        }
    }

    fn execute(&mut self, socket: u8, command: u8) {
        self.commands.push((socket, command));
        let cr = self.sock(socket, regs::SN_CR) as usize;
        let sr = self.sock(socket, regs::SN_SR) as usize;
        self.mem[cr] = command;
        self.cr_pending[socket as usize] = self.cr_latency;

        match command {
            cmd::OPEN => self.mem[sr] = 0x32,
            cmd::CLOSE => self.mem[sr] = 0x00,
            cmd::SEND => self.send(socket),
            cmd::RECV => self.update_rsr(socket),
            _ => {}
        }
    }

    fn send(&mut self, socket: u8) {
        let tx_rd = self.get16(self.sock(socket, regs::SN_TX_RD));
        let tx_wr = self.get16(self.sock(socket, regs::SN_TX_WR));
        let base = self.layout.tx_base + socket as u16 * self.layout.size;

        let packet: Vec<u8> = (0..tx_wr.wrapping_sub(tx_rd))
            .map(|i| self.mem[self.ring_addr(base, tx_rd.wrapping_add(i))])
            .collect();
        self.set16(self.sock(socket, regs::SN_TX_RD), tx_wr);

        let ir = self.sock(socket, regs::SN_IR) as usize;
        self.mem[ir] |= 0x10;

        let (Some((source, ttl)), Some(request)) = (self.auto_reply, EchoHeader::parse(&packet)) else {
            return;
        };

        let mut record = Vec::new();
        record.extend_from_slice(&source.octets());
        record.extend_from_slice(&(ECHO_PACKET_SIZE as u16).to_be_bytes());
        let mut header = [0u8; ICMP_HEADER_SIZE];
        EchoHeader {
            icmp_type: IcmpType::EchoReply as u8,
            ..request
        }
        .write(&mut header);
        record.extend_from_slice(&header);
        record.extend_from_slice(&packet[ICMP_HEADER_SIZE..]);

        let ttl_reg = self.sock(socket, regs::SN_TTL) as usize;
        self.mem[ttl_reg] = ttl;
        self.push_rx(socket, &record);
    }

    fn run(&mut self, operations: &mut [Operation<'_, u8>]) {
        match self.framing {
            Framing::PerByte => {
                for op in operations.iter_mut() {
                    match op {
                        Operation::Write(frame) if frame.len() == 4 && frame[0] == 0xF0 => {
                            self.store(u16::from_be_bytes([frame[1], frame[2]]), frame[3]);
                        }
                        Operation::TransferInPlace(frame) if frame.len() == 4 && frame[0] == 0x0F => {
                            frame[3] = self.load(u16::from_be_bytes([frame[1], frame[2]]));
                        }
                        _ => panic!("unexpected W5100 frame"),
                    }
                }
            }
            Framing::Burst => {
                let (addr, write) = match operations.first() {
                    Some(Operation::Write(header)) if header.len() == 4 => {
                        (u16::from_be_bytes([header[0], header[1]]), header[2] & 0x80 != 0)
                    }
                    _ => panic!("missing W5200 header"),
                };

                match &mut operations[1] {
                    Operation::Write(data) if write => {
                        for (i, &byte) in data.iter().enumerate() {
                            self.store(addr.wrapping_add(i as u16), byte);
                        }
                    }
                    Operation::Read(buffer) if !write => {
                        for (i, byte) in buffer.iter_mut().enumerate() {
                            *byte = self.load(addr.wrapping_add(i as u16));
                        }
                    }
                    _ => panic!("unexpected W5200 payload"),
                }
            }
        }
    }
}

impl ErrorType for FakeChip {
    type Error = FakeError;
}

impl SpiDevice for FakeChip {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), FakeError> {
        if self.fail_after.is_some_and(|limit| self.transactions >= limit) {
            return Err(FakeError);
        }
        self.transactions += 1;
        self.run(operations);
        Ok(())
    }
}
