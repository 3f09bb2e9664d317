//! In-memory register bank and simulated clock for engine tests.

use core::sync::atomic::{AtomicU32, Ordering};
use std::boxed::Box;
use std::vec;
use std::vec::Vec;

use crate::clock::Clock;
use crate::packet::{EchoHeader, IcmpType, ICMP_HEADER_SIZE, PAYLOAD_SIZE};
use crate::socket::{InterruptFlags, SocketHandle, SocketRegisters, SocketStatus};
use crate::types::Ipv4Addr;

/// Every register access, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Status(u8),
    Open(u8),
    Close(u8),
    ReadIr(u8),
    ClearIr(u8, u8),
    RawIp(u8, u8),
    DestAddr(u8, Ipv4Addr),
    DestPort(u8, u16),
    SetTtl(u8, u8),
    SendData(u8, usize),
    IssueSend(u8),
    RxSize(u8),
    ReadPointer(u8),
    ReadRx(u8, u16, usize),
    Advance(u8, u16),
    IssueRecv(u8),
    ReadTtl(u8),
}

impl Call {
    /// Anything beyond reading status registers.
    pub fn touches_socket(&self) -> bool {
        !matches!(self, Call::Status(_))
    }
}

/// What the chip does with a SEND command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    Complete,
    Timeout,
    /// Neither flag is ever raised.
    Hang,
}

/// Produces receive records for each transmitted packet.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

pub struct MockRegisters {
    status: Vec<SocketStatus>,
    ir: Vec<u8>,
    calls: Vec<Call>,
    sent: Vec<Vec<u8>>,
    send_behavior: SendBehavior,
    responder: Option<Responder>,
    rx: Vec<u8>,
    rx_committed: u16,
    rx_pending: u16,
    /// Bytes `read_receive_buffer` stops short of, to simulate truncation.
    rx_shortfall: usize,
    ttl_register: u8,
    tx_queue: Vec<u8>,
}

impl MockRegisters {
    pub fn with_status(status: &[SocketStatus]) -> Self {
        Self {
            status: status.to_vec(),
            ir: vec![0; status.len()],
            calls: Vec::new(),
            sent: Vec::new(),
            send_behavior: SendBehavior::Complete,
            responder: None,
            rx: Vec::new(),
            rx_committed: 0,
            rx_pending: 0,
            rx_shortfall: 0,
            ttl_register: 0,
            tx_queue: Vec::new(),
        }
    }

    /// Four closed sockets, sends complete, nothing ever answers.
    pub fn idle() -> Self {
        Self::with_status(&[SocketStatus::Closed; 4])
    }

    pub fn send_behavior(mut self, behavior: SendBehavior) -> Self {
        self.send_behavior = behavior;
        self
    }

    pub fn responder(mut self, responder: Responder) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn reply_ttl(mut self, ttl: u8) -> Self {
        self.ttl_register = ttl;
        self
    }

    pub fn short_reads(mut self, shortfall: usize) -> Self {
        self.rx_shortfall = shortfall;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// ICMP packets handed to the chip.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn status_of(&self, socket: u8) -> SocketStatus {
        self.status[socket as usize]
    }

    pub fn ir_of(&self, socket: u8) -> u8 {
        self.ir[socket as usize]
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    fn unread(&self) -> u16 {
        (self.rx.len() as u16).wrapping_sub(self.rx_committed)
    }
}

impl SocketRegisters for MockRegisters {
    fn socket_count(&self) -> u8 {
        self.status.len() as u8
    }

    fn socket_status(&mut self, socket: SocketHandle) -> SocketStatus {
        self.calls.push(Call::Status(socket.0));
        self.status[socket.index()]
    }

    fn open(&mut self, socket: SocketHandle) {
        self.calls.push(Call::Open(socket.0));
        self.status[socket.index()] = SocketStatus::IpRaw;
    }

    fn close(&mut self, socket: SocketHandle) {
        self.calls.push(Call::Close(socket.0));
        self.status[socket.index()] = SocketStatus::Closed;
    }

    fn interrupt_flags(&mut self, socket: SocketHandle) -> InterruptFlags {
        self.calls.push(Call::ReadIr(socket.0));
        InterruptFlags::from_bits_truncate(self.ir[socket.index()])
    }

    fn clear_interrupt_flags(&mut self, socket: SocketHandle, mask: u8) {
        self.calls.push(Call::ClearIr(socket.0, mask));
        self.ir[socket.index()] &= !mask;
    }

    fn configure_raw_ip(&mut self, socket: SocketHandle, protocol: u8) {
        self.calls.push(Call::RawIp(socket.0, protocol));
    }

    fn set_destination_address(&mut self, socket: SocketHandle, addr: Ipv4Addr) {
        self.calls.push(Call::DestAddr(socket.0, addr));
    }

    fn set_destination_port(&mut self, socket: SocketHandle, port: u16) {
        self.calls.push(Call::DestPort(socket.0, port));
    }

    fn set_ttl(&mut self, socket: SocketHandle, ttl: u8) {
        self.calls.push(Call::SetTtl(socket.0, ttl));
    }

    fn send_data(&mut self, socket: SocketHandle, data: &[u8]) {
        self.calls.push(Call::SendData(socket.0, data.len()));
        self.tx_queue.extend_from_slice(data);
    }

    fn issue_send(&mut self, socket: SocketHandle) {
        self.calls.push(Call::IssueSend(socket.0));
        let packet = core::mem::take(&mut self.tx_queue);

        match self.send_behavior {
            SendBehavior::Complete => self.ir[socket.index()] |= InterruptFlags::SEND_OK.bits(),
            SendBehavior::Timeout => {
                self.ir[socket.index()] |= InterruptFlags::TIMEOUT.bits();
                self.sent.push(packet);
                return;
            }
            SendBehavior::Hang => {
                self.sent.push(packet);
                return;
            }
        }

        if let Some(responder) = self.responder.as_mut() {
            for record in responder(&packet) {
                self.rx.extend_from_slice(&record);
            }
        }
        self.sent.push(packet);
    }

    fn received_byte_count(&mut self, socket: SocketHandle) -> u16 {
        self.calls.push(Call::RxSize(socket.0));
        self.unread()
    }

    fn read_pointer(&mut self, socket: SocketHandle) -> u16 {
        self.calls.push(Call::ReadPointer(socket.0));
        self.rx_committed
    }

    fn read_receive_buffer(&mut self, socket: SocketHandle, offset: u16, buffer: &mut [u8]) -> usize {
        self.calls.push(Call::ReadRx(socket.0, offset, buffer.len()));
        let start = (offset as usize).min(self.rx.len());
        let available = &self.rx[start..];
        let n = buffer.len().min(available.len()).saturating_sub(self.rx_shortfall);
        buffer[..n].copy_from_slice(&available[..n]);
        n
    }

    fn advance_read_pointer(&mut self, socket: SocketHandle, offset: u16) {
        self.calls.push(Call::Advance(socket.0, offset));
        self.rx_pending = offset;
    }

    fn issue_receive(&mut self, socket: SocketHandle) {
        self.calls.push(Call::IssueRecv(socket.0));
        self.rx_committed = self.rx_pending;
    }

    fn ttl(&mut self, socket: SocketHandle) -> u8 {
        self.calls.push(Call::ReadTtl(socket.0));
        self.ttl_register
    }
}

/// Clock that advances a fixed step on every read.
pub struct MockClock {
    now: AtomicU32,
    step: u32,
}

impl MockClock {
    pub fn new(step: u32) -> Self {
        Self::starting_at(0, step)
    }

    pub fn starting_at(start: u32, step: u32) -> Self {
        Self {
            now: AtomicU32::new(start),
            step,
        }
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.now.fetch_add(self.step, Ordering::Relaxed)
    }
}

/// Receive record as the chip stores it: prefix, echo header, payload.
pub fn reply_record(source: Ipv4Addr, icmp_type: IcmpType, identifier: u16, sequence: u16) -> Vec<u8> {
    let data_len = (ICMP_HEADER_SIZE + PAYLOAD_SIZE) as u16;
    let mut record = Vec::new();
    record.extend_from_slice(&source.octets());
    record.extend_from_slice(&data_len.to_be_bytes());

    let mut header = [0u8; ICMP_HEADER_SIZE];
    EchoHeader {
        icmp_type: icmp_type as u8,
        code: 0,
        checksum: 0,
        identifier,
        sequence,
    }
    .write(&mut header);
    record.extend_from_slice(&header);
    record.extend_from_slice(&[0x20; PAYLOAD_SIZE]);
    record
}

/// Responder that answers every request correctly from `source`.
pub fn echo_responder(source: Ipv4Addr) -> Responder {
    Box::new(move |packet: &[u8]| {
        let request = EchoHeader::parse(packet).expect("request header");
        vec![reply_record(source, IcmpType::EchoReply, request.identifier, request.sequence)]
    })
}
