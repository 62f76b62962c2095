//! Origin State Table
//!
//! Shared map from origin to its counters and ban state. The table lock is
//! held only to look up, insert or remove entries; all evaluation happens
//! under the per-origin mutex, so unrelated origins never wait on each other.
//!
//! Entries are handed out as `Arc` clones taken while the table lock is held.
//! The sweep holds the table write lock and only removes entries whose `Arc`
//! is not shared, so an entry in use by a request is never dropped from under it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::ban::BanState;
use crate::limiter::RateCounters;

/// Everything tracked for one origin
#[derive(Debug, Default)]
pub struct OriginState {
	pub rate: RateCounters,
	pub ban: BanState,
}

impl OriginState {
	/// Purge stale entries. Returns true when the origin holds no state.
	pub fn purge(&mut self, now: Instant) -> bool {
		let rate_idle = self.rate.purge(now);
		let ban_idle = self.ban.purge(now);
		rate_idle && ban_idle
	}
}

pub type OriginEntry = Arc<Mutex<OriginState>>;

/// Concurrent origin to state map
#[derive(Debug, Default)]
pub struct OriginTable {
	entries: RwLock<HashMap<Box<str>, OriginEntry>>,
}

impl OriginTable {
	/// Create an empty table
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, origin: &str) -> Option<OriginEntry> {
		self.entries.read().get(origin).cloned()
	}

	/// Fetch the entry for `origin`, creating it when missing. The flag is
	/// true when this call created it.
	pub fn get_or_create(&self, origin: &str) -> (OriginEntry, bool) {
		if let Some(entry) = self.get(origin) {
			return (entry, false);
		}

		let mut entries = self.entries.write();
		// Another request may have inserted it between the two locks
		if let Some(entry) = entries.get(origin) {
			return (entry.clone(), false);
		}
		let entry = OriginEntry::default();
		entries.insert(origin.into(), entry.clone());
		(entry, true)
	}

	pub fn remove(&self, origin: &str) -> bool {
		self.entries.write().remove(origin).is_some()
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Remove every idle entry that no request currently holds. Returns the
	/// number of removed entries.
	pub fn sweep(&self, now: Instant) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|_, entry| Arc::strong_count(entry) > 1 || !entry.lock().purge(now));
		before - entries.len()
	}

	/// Run `f` on every entry. Entries are visited outside the table lock.
	pub fn for_each<F>(&self, mut f: F)
	where
		F: FnMut(&str, &mut OriginState),
	{
		let snapshot: Vec<(Box<str>, OriginEntry)> =
			self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
		for (origin, entry) in snapshot {
			f(&origin, &mut entry.lock());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::config::{validate_rules, BanRuleConfig, RateLimitRuleConfig};

	#[test]
	fn test_get_or_create() {
		let table = OriginTable::new();
		assert!(table.get("10.0.0.1").is_none());

		let (first, created) = table.get_or_create("10.0.0.1");
		assert!(created);
		let (second, created) = table.get_or_create("10.0.0.1");
		assert!(!created);
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn test_sweep_removes_idle_entries() {
		let clock = ManualClock::new();
		let mut next_id = 0;
		let rules =
			validate_rules(&[RateLimitRuleConfig::new(5, 10)], "rules", &mut next_id).unwrap();
		let table = OriginTable::new();

		for origin in ["a", "b", "c"] {
			let (entry, _) = table.get_or_create(origin);
			entry.lock().rate.check(rules.iter(), clock.at(0)).unwrap();
		}
		// Created but never used
		drop(table.get_or_create("d"));

		assert_eq!(table.sweep(clock.at(5)), 1);
		assert_eq!(table.len(), 3);
		assert_eq!(table.sweep(clock.at(11)), 3);
		assert!(table.is_empty());
	}

	#[test]
	fn test_sweep_keeps_active_bans() {
		let clock = ManualClock::new();
		let rule = BanRuleConfig::new(1, 10, 100).validate().unwrap();
		let table = OriginTable::new();

		let (entry, _) = table.get_or_create("banned");
		entry.lock().ban.report(&rule, clock.at(0));
		drop(entry);

		assert_eq!(table.sweep(clock.at(50)), 0);
		assert_eq!(table.sweep(clock.at(100)), 1);
	}

	#[test]
	fn test_sweep_skips_entries_in_use() {
		let clock = ManualClock::new();
		let table = OriginTable::new();

		let (held, _) = table.get_or_create("busy");
		assert_eq!(table.sweep(clock.at(0)), 0);
		assert_eq!(table.len(), 1);

		drop(held);
		assert_eq!(table.sweep(clock.at(0)), 1);
	}

	#[test]
	fn test_concurrent_creation_yields_one_entry() {
		let table = OriginTable::new();
		std::thread::scope(|s| {
			for _ in 0..8 {
				s.spawn(|| {
					for _ in 0..100 {
						drop(table.get_or_create("shared"));
					}
				});
			}
		});
		assert_eq!(table.len(), 1);
	}
}

// vim: ts=4
