//! Clocks and command-spacing gates.
//!
//! The bottom board drops frames that arrive too close together, so every frame goes
//! through a [`RateLimiter`] first. General commands and display writes are spaced on
//! two independent channels.

use core::cell::Cell;

use embedded_hal::delay::DelayNs;

/// Minimum spacing between general read/write frames (1 ms).
pub const COMMAND_MIN_INTERVAL_US: u64 = 1_000;
/// Minimum spacing between display frames (50 ms).
pub const DISPLAY_MIN_INTERVAL_US: u64 = 50_000;

/// A monotonic microsecond counter.
pub trait Clock {
    fn now_us(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Firmware timer backed by the embassy time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyTimer;

impl Clock for EmbassyTimer {
    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

impl DelayNs for EmbassyTimer {
    fn delay_ns(&mut self, ns: u32) {
        embassy_time::Delay.delay_ns(ns)
    }

    fn delay_us(&mut self, us: u32) {
        embassy_time::Delay.delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        embassy_time::Delay.delay_ms(ms)
    }
}

/// Simulated clock for tests and host runs.
///
/// Sleeping advances the clock by exactly the requested duration, so waits are
/// deterministic and cost no wall time. The timer works through a shared reference,
/// which lets a simulated bus read the same clock the driver sleeps on.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now_ns: Cell<u64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_us(&self, us: u64) {
        self.now_ns.set(self.now_ns.get() + us * 1_000);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1_000);
    }
}

impl Clock for ManualTimer {
    fn now_us(&self) -> u64 {
        self.now_ns.get() / 1_000
    }
}

impl DelayNs for &ManualTimer {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ns));
    }
}

impl DelayNs for ManualTimer {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ns));
    }
}

/// Enforces a minimum interval between successive frames on one channel.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    min_interval_us: u64,
    last_issue_us: Option<u64>,
}

impl RateLimiter {
    pub const fn new(min_interval_us: u64) -> Self {
        Self {
            min_interval_us,
            last_issue_us: None,
        }
    }

    /// Gate for general read/write frames.
    pub const fn general() -> Self {
        Self::new(COMMAND_MIN_INTERVAL_US)
    }

    /// Gate for display frames.
    pub const fn display() -> Self {
        Self::new(DISPLAY_MIN_INTERVAL_US)
    }

    pub fn min_interval_us(&self) -> u64 {
        self.min_interval_us
    }

    pub fn last_issue_us(&self) -> Option<u64> {
        self.last_issue_us
    }

    /// Block until the channel's interval has elapsed, then stamp the issue time.
    ///
    /// Must be called immediately before the frame's first byte goes out. The first
    /// frame on a channel never waits. A stalled clock blocks forever.
    pub fn gate<T>(
        &mut self,
        timer: &mut T,
    ) where
        T: Clock + DelayNs,
    {
        if let Some(last) = self.last_issue_us {
            loop {
                let elapsed = timer.now_us().saturating_sub(last);
                if elapsed >= self.min_interval_us {
                    break;
                }
                let remaining = self.min_interval_us - elapsed;
                tracing::trace!(remaining_us = remaining, "rate limit wait");
                timer.delay_us(u32::try_from(remaining).unwrap_or(u32::MAX));
            }
        }
        self.last_issue_us = Some(timer.now_us());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_gate_does_not_wait() {
        let timer = ManualTimer::new();
        timer.advance_us(7);
        let mut gate = RateLimiter::general();
        gate.gate(&mut &timer);
        assert_eq!(timer.now_us(), 7);
        assert_eq!(gate.last_issue_us(), Some(7));
    }

    #[test]
    fn back_to_back_gates_are_spaced() {
        let timer = ManualTimer::new();
        let mut gate = RateLimiter::display();
        gate.gate(&mut &timer);
        gate.gate(&mut &timer);
        assert_eq!(timer.now_us(), DISPLAY_MIN_INTERVAL_US);
    }

    #[test]
    fn elapsed_interval_skips_the_wait() {
        let timer = ManualTimer::new();
        let mut gate = RateLimiter::general();
        gate.gate(&mut &timer);
        timer.advance_ms(5);
        gate.gate(&mut &timer);
        assert_eq!(timer.now_us(), 5_000);
    }

    #[test]
    fn partial_wait_only_covers_the_remainder() {
        let timer = ManualTimer::new();
        let mut gate = RateLimiter::display();
        gate.gate(&mut &timer);
        timer.advance_ms(20);
        gate.gate(&mut &timer);
        assert_eq!(timer.now_us(), DISPLAY_MIN_INTERVAL_US);
    }

    #[test]
    fn manual_timer_delay_advances_clock() {
        let mut timer = ManualTimer::new();
        timer.delay_ms(200);
        assert_eq!(timer.now_us(), 200_000);
    }
}
