//! Route rule bindings
//!
//! Each route pattern is bound once, at setup, to the rules it is checked
//! against. Routes without an explicit binding use the global rules.

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::rule::RateRule;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RouteBinding {
	/// Global rate rules and the ban rule
	#[default]
	Global,
	/// Global rate rules plus route-specific ones, and the ban rule
	Additive(Box<[RateRule]>),
	/// Route-specific rate rules only; the ban rule still applies
	Standalone(Box<[RateRule]>),
	/// No checks at all, not even bans
	Bypass,
}

impl RouteBinding {
	/// Rate rules that apply under this binding, in evaluation order.
	/// `None` for bypassed routes.
	pub fn rule_sets<'a>(&'a self, global: &'a [RateRule]) -> Option<[&'a [RateRule]; 2]> {
		const NONE: &[RateRule] = &[];
		match self {
			RouteBinding::Global => Some([global, NONE]),
			RouteBinding::Additive(extra) => Some([global, &extra[..]]),
			RouteBinding::Standalone(rules) => Some([&rules[..], NONE]),
			RouteBinding::Bypass => None,
		}
	}

	pub fn is_bypass(&self) -> bool {
		matches!(self, RouteBinding::Bypass)
	}
}

/// Static route pattern to binding table
#[derive(Debug, Default)]
pub struct RouteTable {
	routes: HashMap<Box<str>, RouteBinding>,
}

impl RouteTable {
	/// Create an empty table; every route resolves to global
	pub fn new() -> Self {
		Self::default()
	}

	pub fn bind(&mut self, route: &str, binding: RouteBinding) -> ConfigResult<()> {
		if self.routes.contains_key(route) {
			return Err(ConfigError::DuplicateRoute(route.to_string()));
		}
		self.routes.insert(route.into(), binding);
		Ok(())
	}

	pub fn resolve(&self, route: &str) -> &RouteBinding {
		static GLOBAL: RouteBinding = RouteBinding::Global;
		self.routes.get(route).unwrap_or(&GLOBAL)
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}


// vim: ts=4
