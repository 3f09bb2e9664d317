//! Watchdog state machine.
//!
//! Each dog alternates between pinging its host every test period and,
//! once too many pings in a row are lost, holding its relay on for the
//! restart wait before giving the host time to boot.

use log::{debug, info, warn};
use prodino_ping::{EchoProbe, PingStatus, WINDOWS_PING_ID};

use crate::settings::{DogSetting, SettingError};

/// Ping attempts per check.
pub const PING_RETRIES: u32 = 3;

/// Relay outputs on the board.
pub trait RelayControl {
    /// Switch relay `index` on or off.
    fn set_relay(&mut self, index: usize, on: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Ping,
    Restart,
}

/// Runtime state of one dog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessInfo {
    /// Consecutive lost pings
    pub lost_times: u8,
    /// Restarts since start-up
    pub restarts: u8,
    /// Millisecond timestamp of the next operation
    pub next_time_ms: u32,
    pub next_operation: Operation,
}

/// `N` dogs, one per relay.
pub struct Watchdog<const N: usize> {
    dogs: [DogSetting; N],
    process: [ProcessInfo; N],
}

impl<const N: usize> Watchdog<N> {
    /// Watchdog over `dogs`; call [`Watchdog::start`] before processing.
    pub fn new(dogs: [DogSetting; N]) -> Self {
        Self {
            dogs,
            process: [ProcessInfo::default(); N],
        }
    }

    /// Switch every relay off and schedule each first ping one test period out.
    pub fn start<L: RelayControl>(&mut self, now_ms: u32, relays: &mut L) {
        for (index, (dog, process)) in self.dogs.iter().zip(self.process.iter_mut()).enumerate() {
            *process = ProcessInfo {
                next_time_ms: deadline(now_ms, dog.test_period_s),
                ..ProcessInfo::default()
            };
            relays.set_relay(index, false);
        }
    }

    /// Run every due operation.
    ///
    /// # Arguments
    /// * `now_ms` - Wrapping millisecond timestamp
    /// * `probe` - Pings the watched hosts
    /// * `relays` - Switches the host power
    pub fn process<P: EchoProbe, L: RelayControl>(&mut self, now_ms: u32, probe: &mut P, relays: &mut L) {
        for index in 0..N {
            let dog = self.dogs[index];
            if !dog.active || !is_due(now_ms, self.process[index].next_time_ms) {
                continue;
            }

            match self.process[index].next_operation {
                Operation::Ping => self.check_host(index, now_ms, probe, relays),
                Operation::Restart => self.finish_restart(index, now_ms, relays),
            }
        }
    }

    fn check_host<P: EchoProbe, L: RelayControl>(
        &mut self,
        index: usize,
        now_ms: u32,
        probe: &mut P,
        relays: &mut L,
    ) {
        let dog = self.dogs[index];
        let process = &mut self.process[index];

        let reply = probe.ping(dog.target, WINDOWS_PING_ID, PING_RETRIES);
        process.next_time_ms = deadline(now_ms, dog.test_period_s);

        if reply.status == PingStatus::Success {
            debug!("dog {}: {} alive, {}ms", index, dog.target, reply.round_trip_time_ms);
            process.lost_times = 0;
            return;
        }

        process.lost_times = process.lost_times.saturating_add(1);
        debug!("dog {}: {} {} ({} lost)", index, dog.target, reply.status, process.lost_times);

        if process.lost_times > dog.host_lost_after {
            warn!("dog {}: {} lost, restarting", index, dog.target);
            process.lost_times = 0;
            process.restarts = process.restarts.wrapping_add(1);
            process.next_operation = Operation::Restart;
            process.next_time_ms = deadline(now_ms, dog.restart_wait_s);
            relays.set_relay(index, true);
        }
    }

    fn finish_restart<L: RelayControl>(&mut self, index: usize, now_ms: u32, relays: &mut L) {
        let dog = self.dogs[index];
        let process = &mut self.process[index];

        relays.set_relay(index, false);
        process.next_operation = Operation::Ping;
        process.next_time_ms = deadline(now_ms, dog.wait_after_restart_s);
        info!("dog {}: restart #{} of {} done", index, process.restarts, dog.target);
    }

    /// Replace a dog's settings after validating them.
    ///
    /// The dog's runtime state restarts with a ping one test period out.
    pub fn configure(&mut self, index: usize, setting: DogSetting, now_ms: u32) -> Result<(), SettingError> {
        if index >= N {
            return Err(SettingError::NoSuchDog(index));
        }
        setting.validate()?;

        self.dogs[index] = setting;
        self.process[index] = ProcessInfo {
            next_time_ms: deadline(now_ms, setting.test_period_s),
            ..ProcessInfo::default()
        };
        Ok(())
    }

    /// Current settings, one per relay.
    pub fn settings(&self) -> &[DogSetting; N] {
        &self.dogs
    }

    /// Runtime state of dog `index`.
    pub fn info(&self, index: usize) -> Option<&ProcessInfo> {
        self.process.get(index)
    }
}

fn deadline(now_ms: u32, seconds: u8) -> u32 {
    now_ms.wrapping_add(seconds as u32 * 1000)
}

/// Wrap-safe `now >= at` for timestamps less than ~24 days apart.
fn is_due(now_ms: u32, at_ms: u32) -> bool {
    (now_ms.wrapping_sub(at_ms) as i32) >= 0
}
