//! Chip variants: memory layout and SPI framing.

use embedded_hal::spi::{Operation, SpiDevice};

/// Everything that differs between supported chips.
pub trait Variant {
    /// Name used in log output.
    const NAME: &'static str;
    /// Hardware socket slots.
    const SOCKET_COUNT: u8;
    /// Address of socket 0's register block.
    const SOCKET_BASE: u16;
    /// Distance between socket register blocks.
    const SOCKET_STRIDE: u16 = 0x100;
    /// Start of the transmit buffer memory.
    const TX_BASE: u16;
    /// Start of the receive buffer memory.
    const RX_BASE: u16;
    /// Per-socket buffer size; a power of two.
    const BUFFER_SIZE: u16 = 2048;

    /// Write `data` starting at `addr`.
    fn write<SPI: SpiDevice>(spi: &mut SPI, addr: u16, data: &[u8]) -> Result<(), SPI::Error>;

    /// Fill `buffer` from `addr` onwards.
    fn read<SPI: SpiDevice>(spi: &mut SPI, addr: u16, buffer: &mut [u8]) -> Result<(), SPI::Error>;

    /// Program the per-socket buffer sizes to [`Self::BUFFER_SIZE`].
    fn init_buffers<SPI: SpiDevice>(spi: &mut SPI) -> Result<(), SPI::Error>;

    /// Base address of a socket's register block.
    fn socket_register(socket: u8, offset: u16) -> u16 {
        Self::SOCKET_BASE + socket as u16 * Self::SOCKET_STRIDE + offset
    }

    fn tx_buffer(socket: u8) -> u16 {
        Self::TX_BASE + socket as u16 * Self::BUFFER_SIZE
    }

    fn rx_buffer(socket: u8) -> u16 {
        Self::RX_BASE + socket as u16 * Self::BUFFER_SIZE
    }
}

/// WIZnet W5100: 4 sockets, one byte per SPI frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct W5100;

impl W5100 {
    const OP_WRITE: u8 = 0xF0;
    const OP_READ: u8 = 0x0F;
    const RMSR: u16 = 0x001A;
    const TMSR: u16 = 0x001B;
    /// 2 KiB for each of the four sockets.
    const SIZE_2K_EACH: u8 = 0x55;
}

impl Variant for W5100 {
    const NAME: &'static str = "w5100";
    const SOCKET_COUNT: u8 = 4;
    const SOCKET_BASE: u16 = 0x0400;
    const TX_BASE: u16 = 0x4000;
    const RX_BASE: u16 = 0x6000;

    fn write<SPI: SpiDevice>(spi: &mut SPI, addr: u16, data: &[u8]) -> Result<(), SPI::Error> {
        for (i, byte) in data.iter().enumerate() {
            let [hi, lo] = addr.wrapping_add(i as u16).to_be_bytes();
            spi.write(&[Self::OP_WRITE, hi, lo, *byte])?;
        }
        Ok(())
    }

    fn read<SPI: SpiDevice>(spi: &mut SPI, addr: u16, buffer: &mut [u8]) -> Result<(), SPI::Error> {
        for (i, byte) in buffer.iter_mut().enumerate() {
            let [hi, lo] = addr.wrapping_add(i as u16).to_be_bytes();
            let mut frame = [Self::OP_READ, hi, lo, 0];
            spi.transfer_in_place(&mut frame)?;
            *byte = frame[3];
        }
        Ok(())
    }

    fn init_buffers<SPI: SpiDevice>(spi: &mut SPI) -> Result<(), SPI::Error> {
        Self::write(spi, Self::RMSR, &[Self::SIZE_2K_EACH])?;
        Self::write(spi, Self::TMSR, &[Self::SIZE_2K_EACH])
    }
}

/// WIZnet W5200: 8 sockets, burst frames with a length field.
#[derive(Debug, Clone, Copy, Default)]
pub struct W5200;

impl W5200 {
    const OP_WRITE: u8 = 0x80;
    /// Longest burst the 15-bit length field allows.
    const MAX_BURST: usize = 0x7FFF;

    fn header(addr: u16, len: usize, op: u8) -> [u8; 4] {
        let [hi, lo] = addr.to_be_bytes();
        [hi, lo, op | ((len >> 8) as u8 & 0x7F), len as u8]
    }
}

impl Variant for W5200 {
    const NAME: &'static str = "w5200";
    const SOCKET_COUNT: u8 = 8;
    const SOCKET_BASE: u16 = 0x4000;
    const TX_BASE: u16 = 0x8000;
    const RX_BASE: u16 = 0xC000;

    fn write<SPI: SpiDevice>(spi: &mut SPI, addr: u16, data: &[u8]) -> Result<(), SPI::Error> {
        for (i, chunk) in data.chunks(Self::MAX_BURST).enumerate() {
            let start = addr.wrapping_add((i * Self::MAX_BURST) as u16);
            let header = Self::header(start, chunk.len(), Self::OP_WRITE);
            spi.transaction(&mut [Operation::Write(&header), Operation::Write(chunk)])?;
        }
        Ok(())
    }

    fn read<SPI: SpiDevice>(spi: &mut SPI, addr: u16, buffer: &mut [u8]) -> Result<(), SPI::Error> {
        for (i, chunk) in buffer.chunks_mut(Self::MAX_BURST).enumerate() {
            let start = addr.wrapping_add((i * Self::MAX_BURST) as u16);
            let header = Self::header(start, chunk.len(), 0);
            spi.transaction(&mut [Operation::Write(&header), Operation::Read(chunk)])?;
        }
        Ok(())
    }

    fn init_buffers<SPI: SpiDevice>(spi: &mut SPI) -> Result<(), SPI::Error> {
        let kib = (Self::BUFFER_SIZE / 1024) as u8;
        for socket in 0..Self::SOCKET_COUNT {
            Self::write(spi, Self::socket_register(socket, crate::regs::SN_RXMEM_SIZE), &[kib])?;
            Self::write(spi, Self::socket_register(socket, crate::regs::SN_TXMEM_SIZE), &[kib])?;
        }
        Ok(())
    }
}
