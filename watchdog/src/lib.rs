//! Ping Watchdog
//!
//! Watches up to one host per relay. A host that stops answering pings
//! is power-cycled by holding its relay on, then given time to boot
//! before it is pinged again.
//!
//! ```text
//!            success                     lost > host_lost_after
//!   ┌──────┐ ───────► ┌──────┐ ─────────────────────────────► ┌─────────┐
//!   │ Ping │          │ Ping │                                │ Restart │
//!   └──────┘ ◄─────── └──────┘ ◄───────────────────────────── └─────────┘
//!       test_period_s              relay off, wait_after_restart_s
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use prodino_watchdog::{DogSetting, Watchdog};
//!
//! let mut watchdog = Watchdog::new([DogSetting::watching(host); 4]);
//! watchdog.start(clock.now_ms(), &mut relays);
//! loop {
//!     watchdog.process(clock.now_ms(), &mut pinger, &mut relays);
//! }
//! ```

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

mod process;
mod settings;

pub use process::{Operation, ProcessInfo, RelayControl, Watchdog, PING_RETRIES};
pub use settings::{DogSetting, SettingError, MAX_HOST_LOST_AFTER};
