//! WIZnet Socket Register Adapters
//!
//! Drives the hardware sockets of WIZnet W5100 and W5200 Ethernet
//! offload chips over `embedded-hal` SPI and exposes them to the ping
//! engine through [`prodino_ping::SocketRegisters`].
//!
//! # Design
//!
//! ```text
//!   Pinger ──► SocketRegisters ──► Wiznet<SPI, V> ──► V::read/V::write ──► SPI
//!                                        │
//!                                        └── V = W5100 (per-byte frames)
//!                                            V = W5200 (burst frames)
//! ```
//!
//! The register trait is infallible: a failed SPI transfer is logged,
//! reads back as zero and is latched until [`Wiznet::take_bus_error`].
//!
//! # Usage
//!
//! ```ignore
//! use prodino_wiznet::{NetworkConfig, Wiznet, W5100};
//! use prodino_ping::Pinger;
//!
//! let mut chip = Wiznet::<_, W5100>::new(spi);
//! chip.init(&NetworkConfig::default())?;
//! let mut pinger = Pinger::new(chip, clock);
//! ```

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

mod driver;
pub mod regs;
mod variant;

#[cfg(test)]
mod fake;

pub use driver::{InitError, NetworkConfig, Wiznet};
pub use variant::{Variant, W5100, W5200};
