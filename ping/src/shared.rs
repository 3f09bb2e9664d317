//! Pinger shared between several callers.
//!
//! The chip's socket registers admit one session at a time, so callers
//! are serialised on a spin lock for the full duration of a ping.

use spin::Mutex;

use crate::clock::Clock;
use crate::pinger::{EchoProbe, Pinger};
use crate::socket::SocketRegisters;
use crate::types::{EchoReply, Ipv4Addr, PingStats};

/// [`Pinger`] behind a spin lock, usable through `&self`
pub struct SharedPinger<R, C> {
    inner: Mutex<Pinger<R, C>>,
}

impl<R: SocketRegisters, C: Clock> SharedPinger<R, C> {
    /// Wrap a pinger
    pub const fn new(pinger: Pinger<R, C>) -> Self {
        Self {
            inner: Mutex::new(pinger),
        }
    }

    /// Ping while holding the lock; other callers spin until it returns.
    pub fn ping(&self, target: Ipv4Addr, identifier: u16, retries: u32) -> EchoReply {
        self.inner.lock().ping(target, identifier, retries)
    }

    /// Snapshot of the statistics.
    pub fn stats(&self) -> PingStats {
        *self.inner.lock().stats()
    }

    /// Take the pinger back out
    pub fn into_inner(self) -> Pinger<R, C> {
        self.inner.into_inner()
    }
}

impl<R: SocketRegisters, C: Clock> EchoProbe for SharedPinger<R, C> {
    fn ping(&mut self, target: Ipv4Addr, identifier: u16, retries: u32) -> EchoReply {
        self.inner.get_mut().ping(target, identifier, retries)
    }
}

impl<R: SocketRegisters, C: Clock> EchoProbe for &SharedPinger<R, C> {
    fn ping(&mut self, target: Ipv4Addr, identifier: u16, retries: u32) -> EchoReply {
        SharedPinger::ping(*self, target, identifier, retries)
    }
}
