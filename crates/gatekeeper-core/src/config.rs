//! GateKeeper Configuration
//!
//! Deserializable configuration structs. All durations are whole seconds, the
//! same shape the rules are written in (`{count: 100, window: 10}`). Values are
//! checked once, when the [`GateKeeper`](crate::GateKeeper) is built.

use std::num::NonZeroU32;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::rule::{BanRule, RateRule, RuleId};

/// Upper bound of every window, ban duration and sweep period (one year)
pub const MAX_SECS: u64 = 365 * 24 * 60 * 60;

/// At most `count` requests in any trailing `window` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitRuleConfig {
	pub count: u32,
	pub window: u64,
}

impl RateLimitRuleConfig {
	pub fn new(count: u32, window: u64) -> Self {
		Self { count, window }
	}

	pub(crate) fn validate(&self, rule: &str, id: RuleId) -> ConfigResult<RateRule> {
		let count = NonZeroU32::new(self.count).ok_or_else(|| invalid(rule, "count"))?;
		let window = rule_secs(rule, "window", self.window)?;
		Ok(RateRule { id, count, window })
	}
}

/// Ban for `duration` seconds after `count` reports within `window` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BanRuleConfig {
	pub count: u32,
	pub window: u64,
	pub duration: u64,
}

impl BanRuleConfig {
	pub fn new(count: u32, window: u64, duration: u64) -> Self {
		Self { count, window, duration }
	}

	pub(crate) fn validate(&self) -> ConfigResult<BanRule> {
		const RULE: &str = "ban_rule";
		let count = NonZeroU32::new(self.count).ok_or_else(|| invalid(RULE, "count"))?;
		let window = rule_secs(RULE, "window", self.window)?;
		let duration = rule_secs(RULE, "duration", self.duration)?;
		Ok(BanRule { count, window, duration })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateKeeperConfig {
	/// Header carrying the client address (set by a reverse proxy).
	/// When unset the peer address of the connection is used.
	#[serde(default)]
	pub ip_header: Option<String>,
	/// Report-driven ban rule. Banning is disabled when unset.
	#[serde(default)]
	pub ban_rule: Option<BanRuleConfig>,
	/// Rate limits applied to every route bound globally or additively
	#[serde(default)]
	pub rate_limit_rules: Vec<RateLimitRuleConfig>,
	/// Methods exempt from rate limiting (still subject to bans)
	#[serde(default)]
	pub excluded_methods: Vec<String>,
	/// Tracked origin count above which new origins trigger a reclamation sweep
	#[serde(default = "default_max_tracked_origins")]
	pub max_tracked_origins: usize,
	/// Period of the background reclamation sweep. Must be positive.
	#[serde(default = "default_sweep_interval_secs")]
	pub sweep_interval_secs: u64,
}

fn default_max_tracked_origins() -> usize {
	100_000
}

fn default_sweep_interval_secs() -> u64 {
	60
}

impl Default for GateKeeperConfig {
	fn default() -> Self {
		Self {
			ip_header: None,
			ban_rule: None,
			rate_limit_rules: Vec::new(),
			excluded_methods: Vec::new(),
			max_tracked_origins: default_max_tracked_origins(),
			sweep_interval_secs: default_sweep_interval_secs(),
		}
	}
}

/// Validate a rule list, assigning fresh identities from `next_id`
pub(crate) fn validate_rules(
	rules: &[RateLimitRuleConfig],
	scope: &str,
	next_id: &mut u32,
) -> ConfigResult<Box<[RateRule]>> {
	rules
		.iter()
		.enumerate()
		.map(|(idx, rule)| {
			let id = RuleId(*next_id);
			*next_id += 1;
			rule.validate(&format!("{}[{}]", scope, idx), id)
		})
		.collect()
}

/// Normalize an HTTP method name to upper case, rejecting non-token input
pub(crate) fn normalize_method(method: &str) -> ConfigResult<Box<str>> {
	let is_tchar = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);
	if method.is_empty() || !method.chars().all(is_tchar) {
		return Err(ConfigError::InvalidMethod(method.to_string()));
	}
	Ok(method.to_ascii_uppercase().into())
}

/// Validate the sweep period
pub(crate) fn sweep_interval(secs: u64) -> ConfigResult<Duration> {
	rule_secs("config", "sweep_interval_secs", secs)
}

/// A positive number of seconds, at most [`MAX_SECS`]
fn rule_secs(rule: &str, field: &'static str, secs: u64) -> ConfigResult<Duration> {
	if secs == 0 {
		return Err(invalid(rule, field));
	}
	if secs > MAX_SECS {
		return Err(ConfigError::OutOfRange { rule: rule.to_string(), field, max: MAX_SECS });
	}
	Ok(Duration::from_secs(secs))
}

fn invalid(rule: &str, field: &'static str) -> ConfigError {
	ConfigError::InvalidRule { rule: rule.to_string(), field }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_config_from_yaml() {
		let yaml = r#"
ip_header: x-my-ip
ban_rule: { count: 3, window: 10, duration: 10 }
rate_limit_rules:
  - { count: 20, window: 1 }
  - { count: 100, window: 10 }
excluded_methods: [HEAD]
"#;
		let config: GateKeeperConfig = serde_yaml::from_str(yaml).unwrap();

		assert_eq!(config.ip_header.as_deref(), Some("x-my-ip"));
		assert_eq!(config.ban_rule, Some(BanRuleConfig::new(3, 10, 10)));
		assert_eq!(config.rate_limit_rules.len(), 2);
		assert_eq!(config.rate_limit_rules[1], RateLimitRuleConfig::new(100, 10));
		assert_eq!(config.excluded_methods, vec!["HEAD".to_string()]);
		assert_eq!(config.max_tracked_origins, 100_000);
		assert_eq!(config.sweep_interval_secs, 60);
	}

	#[test]
	fn test_malformed_rule_is_rejected() {
		let yaml = "rate_limit_rules:\n  - { count: 20, windw: 1 }\n";
		assert!(serde_yaml::from_str::<GateKeeperConfig>(yaml).is_err());

		let yaml = "ban_rule: { count: -1, window: 10, duration: 10 }\n";
		assert!(serde_yaml::from_str::<GateKeeperConfig>(yaml).is_err());
	}

	#[test]
	fn test_zero_values_are_rejected() {
		assert_eq!(
			BanRuleConfig::new(3, 10, 0).validate(),
			Err(ConfigError::InvalidRule { rule: "ban_rule".into(), field: "duration" })
		);
		assert!(BanRuleConfig::new(0, 10, 10).validate().is_err());
		assert!(BanRuleConfig::new(3, 0, 10).validate().is_err());

		let mut next_id = 0;
		let err = validate_rules(
			&[RateLimitRuleConfig::new(1, 1), RateLimitRuleConfig::new(5, 0)],
			"rate_limit_rules",
			&mut next_id,
		)
		.unwrap_err();
		assert_eq!(
			err,
			ConfigError::InvalidRule { rule: "rate_limit_rules[1]".into(), field: "window" }
		);
	}

	#[test]
	fn test_oversized_values_are_rejected() {
		assert_eq!(
			BanRuleConfig::new(1, 10, u64::MAX).validate(),
			Err(ConfigError::OutOfRange { rule: "ban_rule".into(), field: "duration", max: MAX_SECS })
		);
		assert!(BanRuleConfig::new(1, MAX_SECS + 1, 10).validate().is_err());
		assert!(BanRuleConfig::new(1, MAX_SECS, MAX_SECS).validate().is_ok());

		let mut next_id = 0;
		let err = validate_rules(&[RateLimitRuleConfig::new(1, u64::MAX)], "rules", &mut next_id)
			.unwrap_err();
		assert_eq!(
			err,
			ConfigError::OutOfRange { rule: "rules[0]".into(), field: "window", max: MAX_SECS }
		);
	}

	#[test]
	fn test_sweep_interval_bounds() {
		assert_eq!(sweep_interval(60), Ok(Duration::from_secs(60)));
		assert_eq!(
			sweep_interval(0),
			Err(ConfigError::InvalidRule { rule: "config".into(), field: "sweep_interval_secs" })
		);
		assert!(sweep_interval(u64::MAX).is_err());
	}

	#[test]
	fn test_rule_ids_are_unique() {
		let rules = [RateLimitRuleConfig::new(2, 5), RateLimitRuleConfig::new(2, 5)];
		let mut next_id = 0;
		let first = validate_rules(&rules, "a", &mut next_id).unwrap();
		let second = validate_rules(&rules, "b", &mut next_id).unwrap();

		assert_eq!(next_id, 4);
		assert_ne!(first[0].id(), first[1].id());
		assert_ne!(first[0].id(), second[0].id());
		assert_eq!(first[0].count(), 2);
		assert_eq!(first[0].window(), Duration::from_secs(5));
	}

	#[test]
	fn test_normalize_method() {
		assert_eq!(normalize_method("head").unwrap().as_ref(), "HEAD");
		assert_eq!(normalize_method("OPTIONS").unwrap().as_ref(), "OPTIONS");
		assert!(normalize_method("").is_err());
		assert!(normalize_method("GET POST").is_err());
	}
}

// vim: ts=4
