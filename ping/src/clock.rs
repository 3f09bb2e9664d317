//! Millisecond time source for poll deadlines.

/// Free-running millisecond counter that wraps at `u32::MAX`.
pub trait Clock {
    /// Current counter value.
    fn now_ms(&self) -> u32;

    /// Milliseconds since `start`, correct across one wrap.
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now_ms().wrapping_sub(start)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Wall clock for hosted targets.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}
