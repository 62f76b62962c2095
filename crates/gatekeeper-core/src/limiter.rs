//! Rate Limiter
//!
//! Per-origin set of sliding windows, one per rule identity. Rules are
//! evaluated in order and evaluation stops at the first violated rule; rules
//! that passed before it keep the recorded request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::rule::{RateRule, RuleId};
use crate::window::SlidingWindow;

/// The rule that denied a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateViolation {
	pub rule: RateRule,
	/// Time until the violated window frees a slot
	pub retry_after: Duration,
}

/// Rate counters of a single origin
#[derive(Debug, Default)]
pub struct RateCounters {
	windows: HashMap<RuleId, SlidingWindow>,
}

impl RateCounters {
	/// Create counters with no recorded requests
	pub fn new() -> Self {
		Self::default()
	}

	/// Evaluate `rules` against this origin, recording the request on every
	/// rule that admits it
	pub fn check<'a, I>(&mut self, rules: I, now: Instant) -> Result<(), RateViolation>
	where
		I: IntoIterator<Item = &'a RateRule>,
	{
		for rule in rules {
			let window = self.windows.entry(rule.id).or_insert_with(|| {
				SlidingWindow::with_capacity(rule.window, rule.limit().min(16))
			});
			if !window.record_if_allowed(now, rule.limit()) {
				return Err(RateViolation { rule: *rule, retry_after: window.retry_after(now) });
			}
		}
		Ok(())
	}

	/// Purge every window and drop the ones left empty. Returns true when no
	/// window remains.
	pub fn purge(&mut self, now: Instant) -> bool {
		self.windows.retain(|_, window| {
			window.purge(now);
			!window.is_empty()
		});
		self.windows.is_empty()
	}

	/// Number of recorded requests for a rule (before purging)
	pub fn recorded(&self, rule: RuleId) -> usize {
		self.windows.get(&rule).map_or(0, SlidingWindow::len)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::config::{validate_rules, RateLimitRuleConfig};

	fn rules(specs: &[(u32, u64)]) -> Box<[RateRule]> {
		let configs: Vec<_> =
			specs.iter().map(|&(count, window)| RateLimitRuleConfig::new(count, window)).collect();
		let mut next_id = 0;
		validate_rules(&configs, "test", &mut next_id).unwrap()
	}

	#[test]
	fn test_scenario_two_per_five_seconds() {
		let clock = ManualClock::new();
		let rules = rules(&[(2, 5)]);
		let mut counters = RateCounters::new();

		assert!(counters.check(rules.iter(), clock.at(0)).is_ok());
		assert!(counters.check(rules.iter(), clock.at(1)).is_ok());
		let violation = counters.check(rules.iter(), clock.at(2)).unwrap_err();
		assert_eq!(violation.rule, rules[0]);
		assert_eq!(violation.retry_after, Duration::from_secs(3));
		assert!(counters.check(rules.iter(), clock.at(6)).is_ok());
	}

	#[test]
	fn test_any_rule_denies() {
		let clock = ManualClock::new();
		let rules = rules(&[(10, 1), (3, 60)]);
		let mut counters = RateCounters::new();

		for t in 0..3 {
			assert!(counters.check(rules.iter(), clock.at(t)).is_ok());
		}
		let violation = counters.check(rules.iter(), clock.at(10)).unwrap_err();
		assert_eq!(violation.rule.count(), 3);
	}

	#[test]
	fn test_passed_rules_keep_the_request() {
		let clock = ManualClock::new();
		let rules = rules(&[(10, 60), (1, 60)]);
		let mut counters = RateCounters::new();

		assert!(counters.check(rules.iter(), clock.at(0)).is_ok());
		assert!(counters.check(rules.iter(), clock.at(1)).is_err());
		// The first rule admitted both requests, the second only one
		assert_eq!(counters.recorded(rules[0].id()), 2);
		assert_eq!(counters.recorded(rules[1].id()), 1);
	}

	#[test]
	fn test_identical_rules_count_separately() {
		let clock = ManualClock::new();
		let rules = rules(&[(2, 10), (2, 10)]);
		let mut counters = RateCounters::new();

		assert!(counters.check(&rules[..1], clock.at(0)).is_ok());
		assert!(counters.check(&rules[..1], clock.at(0)).is_ok());
		assert!(counters.check(&rules[..1], clock.at(0)).is_err());
		// Same parameters, different identity: fresh counter
		assert!(counters.check(&rules[1..], clock.at(0)).is_ok());
	}

	#[test]
	fn test_empty_rule_set_allows() {
		let clock = ManualClock::new();
		let mut counters = RateCounters::new();
		for _ in 0..100 {
			assert!(counters.check(std::iter::empty(), clock.at(0)).is_ok());
		}
		assert!(counters.purge(clock.at(0)));
	}

	#[test]
	fn test_purge_drops_idle_windows() {
		let clock = ManualClock::new();
		let rules = rules(&[(5, 1), (5, 30)]);
		let mut counters = RateCounters::new();

		assert!(counters.check(rules.iter(), clock.at(0)).is_ok());
		assert!(!counters.purge(clock.at(5)));
		assert_eq!(counters.recorded(rules[0].id()), 0);
		assert!(counters.purge(clock.at(31)));
	}
}

// vim: ts=4
