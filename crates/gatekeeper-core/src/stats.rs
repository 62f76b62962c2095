//! GateKeeper statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the engine state and lifetime counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateKeeperStats {
	/// Origins currently holding state
	pub tracked_origins: usize,
	/// Origins currently banned
	pub active_bans: usize,
	/// Requests denied by a rate rule
	pub total_rate_limited: u64,
	/// Requests denied because the origin was banned
	pub total_ban_rejections: u64,
	/// Bans issued (including extensions of a running ban)
	pub total_bans_issued: u64,
	/// Reports received
	pub total_reports: u64,
	/// Origin entries reclaimed by sweeps
	pub total_swept: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
	pub rate_limited: AtomicU64,
	pub ban_rejections: AtomicU64,
	pub bans_issued: AtomicU64,
	pub reports: AtomicU64,
	pub swept: AtomicU64,
}

impl Counters {
	pub fn incr(counter: &AtomicU64) {
		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub fn add(counter: &AtomicU64, amount: u64) {
		counter.fetch_add(amount, Ordering::Relaxed);
	}

	pub fn snapshot(&self, tracked_origins: usize, active_bans: usize) -> GateKeeperStats {
		GateKeeperStats {
			tracked_origins,
			active_bans,
			total_rate_limited: self.rate_limited.load(Ordering::Relaxed),
			total_ban_rejections: self.ban_rejections.load(Ordering::Relaxed),
			total_bans_issued: self.bans_issued.load(Ordering::Relaxed),
			total_reports: self.reports.load(Ordering::Relaxed),
			total_swept: self.swept.load(Ordering::Relaxed),
		}
	}
}

// vim: ts=4
