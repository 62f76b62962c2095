//! Ban Tracker
//!
//! Per-origin report log and ban expiry. An origin moves from clean to
//! reported as reports arrive, and to banned once `count` reports fall within
//! the ban window. Expiry is observed lazily: the first check after
//! `banned_until` returns the origin to clean and forgets its old reports.

use std::time::{Duration, Instant};

use crate::rule::BanRule;
use crate::window::SlidingWindow;

/// Result of recording a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
	/// Reports inside the ban window after recording this one
	pub reports: usize,
	/// Set when this report crossed the threshold
	pub banned_until: Option<Instant>,
}

/// Report log and ban expiry of one origin
#[derive(Debug, Default)]
pub struct BanState {
	reports: Option<SlidingWindow>,
	banned_until: Option<Instant>,
}

impl BanState {
	/// Create a clean state
	pub fn new() -> Self {
		Self::default()
	}

	/// Record a report. Reports are recorded even while banned; crossing the
	/// threshold again during a ban extends it.
	pub fn report(&mut self, rule: &BanRule, now: Instant) -> ReportOutcome {
		self.expire(now);

		let threshold = rule.threshold();
		let reports = self
			.reports
			.get_or_insert_with(|| SlidingWindow::with_capacity(rule.window, threshold.min(16)))
			.record(now, threshold);

		if reports < threshold {
			return ReportOutcome { reports, banned_until: None };
		}

		let until = now + rule.duration;
		let until = self.banned_until.map_or(until, |current| current.max(until));
		self.banned_until = Some(until);
		ReportOutcome { reports, banned_until: Some(until) }
	}

	/// Expiry of the active ban, if any
	pub fn banned_until(&mut self, now: Instant) -> Option<Instant> {
		self.expire(now);
		self.banned_until
	}

	pub fn is_banned(&mut self, now: Instant) -> bool {
		self.banned_until(now).is_some()
	}

	/// Remaining ban time, if banned
	pub fn remaining(&mut self, now: Instant) -> Option<Duration> {
		self.banned_until(now).map(|until| until.saturating_duration_since(now))
	}

	/// Drop the ban and the report log
	pub fn lift(&mut self) {
		self.banned_until = None;
		self.reports = None;
	}

	/// Expire the ban and stale reports. Returns true when nothing is left.
	pub fn purge(&mut self, now: Instant) -> bool {
		self.expire(now);
		if let Some(log) = self.reports.as_mut() {
			log.purge(now);
			if log.is_empty() {
				self.reports = None;
			}
		}
		self.banned_until.is_none() && self.reports.is_none()
	}

	fn expire(&mut self, now: Instant) {
		if self.banned_until.is_some_and(|until| until <= now) {
			self.banned_until = None;
			// Reports from before the ban must not combine with new ones
			self.reports = None;
		}
	}
}


// vim: ts=4
