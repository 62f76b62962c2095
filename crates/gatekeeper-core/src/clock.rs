//! Time source abstraction
//!
//! The engine never reads the system time directly; it asks a [`Clock`]. The
//! server uses [`SystemClock`], tests drive a [`ManualClock`].

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of the current instant
pub trait Clock: Send + Sync {
	fn now(&self) -> Instant;
}

/// Monotonic wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Instant {
		Instant::now()
	}
}

/// Manually advanced clock for deterministic tests and simulations
#[derive(Debug)]
pub struct ManualClock {
	base: Instant,
	offset: Mutex<Duration>,
}

impl ManualClock {
	/// Create a clock standing at its origin
	pub fn new() -> Self {
		Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }
	}

	/// Instant at `secs` seconds after the clock's origin
	pub fn at(&self, secs: u64) -> Instant {
		self.base + Duration::from_secs(secs)
	}

	pub fn advance(&self, by: Duration) {
		*self.offset.lock() += by;
	}

	/// Jump to an absolute offset from the clock's origin. Moving backwards is ignored.
	pub fn set_secs(&self, secs: u64) {
		let mut offset = self.offset.lock();
		*offset = (*offset).max(Duration::from_secs(secs));
	}
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Instant {
		self.base + *self.offset.lock()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_manual_clock_advance() {
		let clock = ManualClock::new();
		let start = clock.now();

		clock.advance(Duration::from_millis(1500));
		assert_eq!(clock.now() - start, Duration::from_millis(1500));

		clock.set_secs(10);
		assert_eq!(clock.now(), clock.at(10));
	}

	#[test]
	fn test_manual_clock_never_goes_back() {
		let clock = ManualClock::new();
		clock.set_secs(20);
		clock.set_secs(5);
		assert_eq!(clock.now(), clock.at(20));
	}
}

// vim: ts=4
