//! GateKeeper engine
//!
//! Resolves the route binding of a request, checks the ban state of its
//! origin and then every applicable rate rule. The ban check comes first and
//! shadows rate limiting: a banned origin never touches its rate counters.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{
	normalize_method, sweep_interval, validate_rules, GateKeeperConfig, RateLimitRuleConfig,
};
use crate::error::ConfigResult;
use crate::route::{RouteBinding, RouteTable};
use crate::rule::{BanRule, RateRule};
use crate::state::{OriginEntry, OriginTable};
use crate::stats::{Counters, GateKeeperStats};

/// Minimum time between two sweeps triggered by origin table growth
const MIN_TRIGGERED_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
	/// The origin is banned
	Banned,
	/// A rate rule is exhausted
	RateLimited {
		/// Limit of the violated rule
		count: u32,
		/// Window of the violated rule
		window: Duration,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
	pub reason: DenyReason,
	/// Time until the origin may succeed again
	pub retry_after: Duration,
}

impl Denial {
	/// Retry hint in whole seconds, rounded up, at least 1
	pub fn retry_after_secs(&self) -> u64 {
		let secs = self.retry_after.as_secs() + u64::from(self.retry_after.subsec_nanos() > 0);
		secs.max(1)
	}

	pub fn is_ban(&self) -> bool {
		matches!(self.reason, DenyReason::Banned)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	Allow,
	Deny(Denial),
}

impl Decision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Allow)
	}

	pub fn denial(&self) -> Option<&Denial> {
		match self {
			Decision::Allow => None,
			Decision::Deny(denial) => Some(denial),
		}
	}
}

enum RouteSpec {
	Specific { rules: Vec<RateLimitRuleConfig>, standalone: bool },
	Bypass,
}

/// Builder collecting route bindings before validation
pub struct GateKeeperBuilder {
	config: GateKeeperConfig,
	routes: Vec<(String, RouteSpec)>,
	clock: Arc<dyn Clock>,
}

impl GateKeeperBuilder {
	pub fn new(config: GateKeeperConfig) -> Self {
		Self { config, routes: Vec::new(), clock: Arc::new(SystemClock) }
	}

	/// Bind route-specific rate rules. With `standalone` they replace the
	/// global rules for this route, otherwise they are checked in addition.
	pub fn specific(
		mut self,
		route: impl Into<String>,
		rules: Vec<RateLimitRuleConfig>,
		standalone: bool,
	) -> Self {
		self.routes.push((route.into(), RouteSpec::Specific { rules, standalone }));
		self
	}

	/// Exempt a route from every check, bans included
	pub fn bypass(mut self, route: impl Into<String>) -> Self {
		self.routes.push((route.into(), RouteSpec::Bypass));
		self
	}

	/// Use a custom time source
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	/// Validate the configuration and bindings
	pub fn build(self) -> ConfigResult<GateKeeper> {
		let config = self.config;
		let mut next_id = 0;

		let ban_rule = config.ban_rule.as_ref().map(|rule| rule.validate()).transpose()?;
		let sweep_interval = sweep_interval(config.sweep_interval_secs)?;
		let global_rules = validate_rules(&config.rate_limit_rules, "rate_limit_rules", &mut next_id)?;
		let excluded_methods = config
			.excluded_methods
			.iter()
			.map(|method| normalize_method(method))
			.collect::<ConfigResult<HashSet<_>>>()?;

		let mut routes = RouteTable::new();
		for (route, spec) in self.routes {
			let binding = match spec {
				RouteSpec::Specific { rules, standalone } => {
					let scope = format!("{} rate_limit_rules", route);
					let rules = validate_rules(&rules, &scope, &mut next_id)?;
					if standalone {
						RouteBinding::Standalone(rules)
					} else {
						RouteBinding::Additive(rules)
					}
				}
				RouteSpec::Bypass => RouteBinding::Bypass,
			};
			routes.bind(&route, binding)?;
		}

		if ban_rule.is_none() {
			debug!("No ban rule configured, reports will be ignored");
		}
		info!(
			"GateKeeper ready: {} global rate rules, {} route bindings, banning {}",
			global_rules.len(),
			routes.len(),
			if ban_rule.is_some() { "enabled" } else { "disabled" }
		);

		Ok(GateKeeper {
			ip_header: config.ip_header.map(Into::into),
			ban_rule,
			global_rules,
			excluded_methods,
			routes,
			origins: OriginTable::new(),
			clock: self.clock,
			max_tracked_origins: config.max_tracked_origins,
			sweep_interval,
			last_triggered_sweep: Mutex::new(None),
			counters: Counters::default(),
		})
	}
}

/// Request admission engine
pub struct GateKeeper {
	ip_header: Option<Box<str>>,
	ban_rule: Option<BanRule>,
	global_rules: Box<[RateRule]>,
	excluded_methods: HashSet<Box<str>>,
	routes: RouteTable,
	origins: OriginTable,
	clock: Arc<dyn Clock>,
	max_tracked_origins: usize,
	sweep_interval: Duration,
	last_triggered_sweep: Mutex<Option<Instant>>,
	counters: Counters,
}

impl GateKeeper {
	pub fn builder(config: GateKeeperConfig) -> GateKeeperBuilder {
		GateKeeperBuilder::new(config)
	}

	/// Build without route-specific bindings
	pub fn new(config: GateKeeperConfig) -> ConfigResult<Self> {
		GateKeeperBuilder::new(config).build()
	}

	pub fn ip_header(&self) -> Option<&str> {
		self.ip_header.as_deref()
	}

	pub fn ban_rule(&self) -> Option<&BanRule> {
		self.ban_rule.as_ref()
	}

	pub fn global_rules(&self) -> &[RateRule] {
		&self.global_rules
	}

	pub fn sweep_interval(&self) -> Duration {
		self.sweep_interval
	}

	pub fn now(&self) -> Instant {
		self.clock.now()
	}

	/// Binding of a route pattern; unbound routes are global
	pub fn binding(&self, route: &str) -> &RouteBinding {
		self.routes.resolve(route)
	}

	/// Decide whether a request may proceed
	pub fn intercept(&self, origin: &str, method: &str, route: &str) -> Decision {
		self.intercept_at(origin, method, route, self.now())
	}

	pub fn intercept_at(&self, origin: &str, method: &str, route: &str, now: Instant) -> Decision {
		self.intercept_binding(self.binding(route), origin, method, now)
	}

	/// Decide under an explicit binding
	pub fn intercept_binding(
		&self,
		binding: &RouteBinding,
		origin: &str,
		method: &str,
		now: Instant,
	) -> Decision {
		let Some(rule_sets) = binding.rule_sets(&self.global_rules) else {
			return Decision::Allow;
		};

		let rate_exempt = self.excluded_methods.contains(method);
		if rate_exempt || rule_sets.iter().all(|set| set.is_empty()) {
			// Only the ban applies; unknown origins stay untracked
			if self.ban_rule.is_none() {
				return Decision::Allow;
			}
			let remaining = self.origins.get(origin).and_then(|entry| entry.lock().ban.remaining(now));
			return match remaining {
				Some(remaining) => self.deny_banned(origin, remaining),
				None => Decision::Allow,
			};
		}

		let entry = self.entry(origin, now);
		let mut state = entry.lock();
		if let Some(remaining) = state.ban.remaining(now) {
			drop(state);
			return self.deny_banned(origin, remaining);
		}

		match state.rate.check(rule_sets.into_iter().flatten(), now) {
			Ok(()) => Decision::Allow,
			Err(violation) => {
				drop(state);
				Counters::incr(&self.counters.rate_limited);
				debug!(
					"Rate limited {} ({} per {:?}), retry after {:?}",
					origin,
					violation.rule.count(),
					violation.rule.window(),
					violation.retry_after
				);
				Decision::Deny(Denial {
					reason: DenyReason::RateLimited {
						count: violation.rule.count(),
						window: violation.rule.window(),
					},
					retry_after: violation.retry_after,
				})
			}
		}
	}

	/// Register a ban-relevant event for `origin`. Returns true when this
	/// report banned the origin (or extended its ban).
	pub fn report(&self, origin: &str) -> bool {
		self.report_at(origin, self.now())
	}

	pub fn report_at(&self, origin: &str, now: Instant) -> bool {
		let Some(rule) = self.ban_rule else {
			debug!("Ignoring report for {}: banning is disabled", origin);
			return false;
		};
		Counters::incr(&self.counters.reports);

		let entry = self.entry(origin, now);
		let outcome = entry.lock().ban.report(&rule, now);
		match outcome.banned_until {
			Some(until) => {
				Counters::incr(&self.counters.bans_issued);
				info!(
					"Banned {} for {:?} after {} reports",
					origin,
					until.saturating_duration_since(now),
					outcome.reports
				);
				true
			}
			None => {
				debug!("Reported {} ({}/{})", origin, outcome.reports, rule.count());
				false
			}
		}
	}

	pub fn is_banned(&self, origin: &str) -> bool {
		self.is_banned_at(origin, self.now())
	}

	pub fn is_banned_at(&self, origin: &str, now: Instant) -> bool {
		self.ban_remaining_at(origin, now).is_some()
	}

	/// Remaining ban time of `origin`, if banned
	pub fn ban_remaining_at(&self, origin: &str, now: Instant) -> Option<Duration> {
		self.origins.get(origin).and_then(|entry| entry.lock().ban.remaining(now))
	}

	/// Lift the ban of `origin` and forget its reports
	pub fn unban(&self, origin: &str) -> bool {
		let Some(entry) = self.origins.get(origin) else {
			return false;
		};
		let mut state = entry.lock();
		let was_banned = state.ban.is_banned(self.now());
		state.ban.lift();
		if was_banned {
			info!("Unbanned {}", origin);
		}
		was_banned
	}

	/// Forget all state of `origin`. A request already holding the entry
	/// finishes against the dropped state.
	pub fn reset(&self, origin: &str) -> bool {
		let removed = self.origins.remove(origin);
		if removed {
			debug!("Reset state of {}", origin);
		}
		removed
	}

	/// Currently banned origins with their remaining ban time
	pub fn list_bans(&self) -> Vec<(Box<str>, Duration)> {
		let now = self.now();
		let mut bans = Vec::new();
		self.origins.for_each(|origin, state| {
			if let Some(remaining) = state.ban.remaining(now) {
				bans.push((origin.into(), remaining));
			}
		});
		bans
	}

	/// Reclaim origins with no live state. Returns the number of removed origins.
	pub fn sweep(&self) -> usize {
		self.sweep_at(self.now())
	}

	pub fn sweep_at(&self, now: Instant) -> usize {
		let removed = self.origins.sweep(now);
		Counters::add(&self.counters.swept, u64::try_from(removed).unwrap_or(u64::MAX));
		if removed > 0 {
			debug!("Swept {} idle origins, {} tracked", removed, self.origins.len());
		}
		removed
	}

	pub fn tracked_origins(&self) -> usize {
		self.origins.len()
	}

	pub fn stats(&self) -> GateKeeperStats {
		let now = self.now();
		let mut active_bans = 0;
		self.origins.for_each(|_, state| {
			if state.ban.is_banned(now) {
				active_bans += 1;
			}
		});
		self.counters.snapshot(self.origins.len(), active_bans)
	}

	fn deny_banned(&self, origin: &str, remaining: Duration) -> Decision {
		Counters::incr(&self.counters.ban_rejections);
		debug!("Rejected banned origin {}, {:?} left", origin, remaining);
		Decision::Deny(Denial { reason: DenyReason::Banned, retry_after: remaining })
	}

	/// Entry for `origin`, sweeping when a new origin pushes the table past its cap
	fn entry(&self, origin: &str, now: Instant) -> OriginEntry {
		let (entry, created) = self.origins.get_or_create(origin);
		if created && self.origins.len() > self.max_tracked_origins {
			self.triggered_sweep(now);
		}
		entry
	}

	fn triggered_sweep(&self, now: Instant) {
		{
			let mut last = self.last_triggered_sweep.lock();
			if last.is_some_and(|at| now.saturating_duration_since(at) < MIN_TRIGGERED_SWEEP_INTERVAL) {
				return;
			}
			*last = Some(now);
		}

		self.sweep_at(now);
		let tracked = self.origins.len();
		if tracked > self.max_tracked_origins {
			warn!(
				"Tracking {} origins with live state, above the configured {}",
				tracked, self.max_tracked_origins
			);
		}
	}
}


// vim: ts=4
