//! Per-host watchdog settings

use core::fmt;

use prodino_ping::Ipv4Addr;

/// Highest accepted `host_lost_after`.
pub const MAX_HOST_LOST_AFTER: u8 = 10;

/// What to watch and how to react. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DogSetting {
    pub active: bool,
    /// Host that must answer pings
    pub target: Ipv4Addr,
    /// Delay between pings
    pub test_period_s: u8,
    /// Failed pings tolerated before a restart
    pub host_lost_after: u8,
    /// How long the relay stays on during a restart
    pub restart_wait_s: u8,
    /// Grace period before pinging a restarted host
    pub wait_after_restart_s: u8,
}

impl DogSetting {
    /// Inactive dog with the factory timings.
    pub const fn new() -> Self {
        Self {
            active: false,
            target: Ipv4Addr::UNSPECIFIED,
            test_period_s: 30,
            host_lost_after: 3,
            restart_wait_s: 10,
            wait_after_restart_s: 60,
        }
    }

    /// Active dog watching `target` with the factory timings.
    pub const fn watching(target: Ipv4Addr) -> Self {
        let mut setting = Self::new();
        setting.active = true;
        setting.target = target;
        setting
    }

    /// Check every field is in range. Inactive dogs may keep a zero target.
    pub fn validate(&self) -> Result<(), SettingError> {
        if self.active && self.target.is_unspecified() {
            return Err(SettingError::MissingTarget);
        }
        if self.test_period_s == 0 {
            return Err(SettingError::ZeroTestPeriod);
        }
        if self.host_lost_after == 0 || self.host_lost_after > MAX_HOST_LOST_AFTER {
            return Err(SettingError::HostLostAfterOutOfRange(self.host_lost_after));
        }
        if self.restart_wait_s == 0 {
            return Err(SettingError::ZeroRestartWait);
        }
        if self.wait_after_restart_s == 0 {
            return Err(SettingError::ZeroWaitAfterRestart);
        }
        Ok(())
    }
}

impl Default for DogSetting {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingError {
    MissingTarget,
    ZeroTestPeriod,
    HostLostAfterOutOfRange(u8),
    ZeroRestartWait,
    ZeroWaitAfterRestart,
    /// Dog index past the end of the list
    NoSuchDog(usize),
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTarget => write!(f, "active dog has no target address"),
            Self::ZeroTestPeriod => write!(f, "test period must be at least 1 s"),
            Self::HostLostAfterOutOfRange(n) => {
                write!(f, "host lost after {} is outside 1..={}", n, MAX_HOST_LOST_AFTER)
            }
            Self::ZeroRestartWait => write!(f, "restart wait must be at least 1 s"),
            Self::ZeroWaitAfterRestart => write!(f, "wait after restart must be at least 1 s"),
            Self::NoSuchDog(index) => write!(f, "no dog at index {}", index),
        }
    }
}
