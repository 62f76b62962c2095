//! Sliding Window Counter
//!
//! Time-ordered log of event timestamps for one (origin, rule) pair. Entries
//! older than `now - window` are purged from the front before every decision,
//! so the remaining length is the number of events in the trailing window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Timestamp log of one (origin, rule) pair
#[derive(Debug, Clone)]
pub struct SlidingWindow {
	window: Duration,
	entries: VecDeque<Instant>,
}

impl SlidingWindow {
	/// Create an empty log over `window`
	pub fn new(window: Duration) -> Self {
		Self { window, entries: VecDeque::new() }
	}

	pub fn with_capacity(window: Duration, capacity: usize) -> Self {
		Self { window, entries: VecDeque::with_capacity(capacity) }
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	/// Number of entries currently held (call [`purge`](Self::purge) first for
	/// the count relative to a given instant)
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn oldest(&self) -> Option<Instant> {
		self.entries.front().copied()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	/// Drop every entry strictly older than `now - window`
	pub fn purge(&mut self, now: Instant) {
		let Some(cutoff) = now.checked_sub(self.window) else {
			return;
		};
		while self.entries.front().is_some_and(|&t| t < cutoff) {
			self.entries.pop_front();
		}
	}

	/// Record `now` if fewer than `limit` events remain in the window.
	///
	/// A denied event is not recorded, so rejected traffic never extends the
	/// caller's own throttling.
	pub fn record_if_allowed(&mut self, now: Instant, limit: usize) -> bool {
		self.purge(now);
		if self.entries.len() < limit {
			self.push(now);
			true
		} else {
			false
		}
	}

	/// Record `now` unconditionally, keeping at most `cap` of the newest
	/// entries. Returns the in-window count after recording.
	pub fn record(&mut self, now: Instant, cap: usize) -> usize {
		self.purge(now);
		self.push(now);
		while self.entries.len() > cap {
			self.entries.pop_front();
		}
		self.entries.len()
	}

	/// Time until the oldest entry leaves the window
	pub fn retry_after(&self, now: Instant) -> Duration {
		self.oldest()
			.map(|oldest| (oldest + self.window).saturating_duration_since(now))
			.unwrap_or(Duration::ZERO)
	}

	fn push(&mut self, now: Instant) {
		// Callers may race on reading the clock; keep the log ordered
		let at = self.entries.back().map_or(now, |&last| last.max(now));
		self.entries.push_back(at);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;

	#[test]
	fn test_allows_up_to_limit() {
		let clock = ManualClock::new();
		let mut window = SlidingWindow::new(Duration::from_secs(5));

		assert!(window.record_if_allowed(clock.at(0), 2));
		assert!(window.record_if_allowed(clock.at(1), 2));
		assert!(!window.record_if_allowed(clock.at(2), 2));
		assert_eq!(window.len(), 2);
	}

	#[test]
	fn test_window_slides() {
		let clock = ManualClock::new();
		let mut window = SlidingWindow::new(Duration::from_secs(5));

		assert!(window.record_if_allowed(clock.at(0), 2));
		assert!(window.record_if_allowed(clock.at(1), 2));
		assert!(!window.record_if_allowed(clock.at(2), 2));
		// t=0 left the window at t=6, t=1 is still inside
		assert!(window.record_if_allowed(clock.at(6), 2));
		assert!(!window.record_if_allowed(clock.at(6), 2));
		assert_eq!(window.oldest(), Some(clock.at(1)));
	}

	#[test]
	fn test_entry_on_window_edge_is_kept() {
		let clock = ManualClock::new();
		let mut window = SlidingWindow::new(Duration::from_secs(10));

		window.record(clock.at(0), 10);
		window.purge(clock.at(10));
		assert_eq!(window.len(), 1);
		window.purge(clock.at(11));
		assert!(window.is_empty());
	}

	#[test]
	fn test_denials_are_not_recorded() {
		let clock = ManualClock::new();
		let mut window = SlidingWindow::new(Duration::from_secs(10));

		assert!(window.record_if_allowed(clock.at(0), 3));
		assert!(window.record_if_allowed(clock.at(1), 3));
		assert!(window.record_if_allowed(clock.at(2), 3));
		for t in 3..9 {
			assert!(!window.record_if_allowed(clock.at(t), 3));
		}
		assert_eq!(window.len(), 3);
		// Only the admitted t=0 expires, so exactly one more slot opens
		assert!(window.record_if_allowed(clock.at(11), 3));
		assert!(!window.record_if_allowed(clock.at(11), 3));
	}

	#[test]
	fn test_record_caps_entries() {
		let clock = ManualClock::new();
		let mut window = SlidingWindow::new(Duration::from_secs(60));

		for t in 0..10 {
			window.record(clock.at(t), 3);
		}
		assert_eq!(window.len(), 3);
		assert_eq!(window.oldest(), Some(clock.at(7)));
	}

	#[test]
	fn test_retry_after() {
		let clock = ManualClock::new();
		let mut window = SlidingWindow::new(Duration::from_secs(5));

		assert_eq!(window.retry_after(clock.at(0)), Duration::ZERO);
		window.record_if_allowed(clock.at(1), 1);
		assert_eq!(window.retry_after(clock.at(2)), Duration::from_secs(4));
		assert_eq!(window.retry_after(clock.at(9)), Duration::ZERO);
	}

	#[test]
	fn test_out_of_order_now_keeps_log_ordered() {
		let clock = ManualClock::new();
		let mut window = SlidingWindow::new(Duration::from_secs(5));

		window.record_if_allowed(clock.at(3), 5);
		window.record_if_allowed(clock.at(2), 5);
		assert_eq!(window.oldest(), Some(clock.at(3)));
		assert_eq!(window.len(), 2);
	}
}

// vim: ts=4
