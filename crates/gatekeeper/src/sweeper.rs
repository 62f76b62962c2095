//! Background sweep task

use std::sync::Arc;

use gatekeeper_core::GateKeeper;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Periodically reclaim idle origins.
///
/// The task holds a weak reference and stops once the engine is dropped.
pub fn spawn_sweeper(gk: &Arc<GateKeeper>) -> JoinHandle<()> {
	let weak = Arc::downgrade(gk);
	let period = gk.sweep_interval();

	tokio::spawn(async move {
		let mut interval = tokio::time::interval(period);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
		// First tick completes immediately
		interval.tick().await;

		loop {
			interval.tick().await;

			let Some(gk) = weak.upgrade() else {
				debug!("GateKeeper dropped, stopping sweeper");
				break;
			};
			gk.sweep();
		}
	})
}

// vim: ts=4
