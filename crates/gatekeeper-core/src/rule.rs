//! Validated rate and ban rules

use std::num::NonZeroU32;
use std::time::Duration;

/// Identity of a rate rule.
///
/// Two rules with identical parameters but different identities keep
/// separate counters (a global rule and a route's own rule answer different
/// questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
	pub fn get(self) -> u32 {
		self.0
	}
}

/// At most `count` requests within any trailing `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRule {
	pub(crate) id: RuleId,
	pub(crate) count: NonZeroU32,
	pub(crate) window: Duration,
}

impl RateRule {
	pub fn id(&self) -> RuleId {
		self.id
	}

	pub fn count(&self) -> u32 {
		self.count.get()
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	pub(crate) fn limit(&self) -> usize {
		usize::try_from(self.count.get()).unwrap_or(usize::MAX)
	}
}

/// `count` reports within `window` ban the origin for `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BanRule {
	pub(crate) count: NonZeroU32,
	pub(crate) window: Duration,
	pub(crate) duration: Duration,
}

impl BanRule {
	pub fn count(&self) -> u32 {
		self.count.get()
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	pub fn duration(&self) -> Duration {
		self.duration
	}

	pub(crate) fn threshold(&self) -> usize {
		usize::try_from(self.count.get()).unwrap_or(usize::MAX)
	}
}

// vim: ts=4
