//! Configuration Error Types
//!
//! Every error here is raised while building a [`GateKeeper`](crate::GateKeeper);
//! request-time evaluation never fails.

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	/// A rule field that must be positive was zero
	InvalidRule {
		/// Which rule ("ban_rule", "rate_limit_rules[1]", "/login rate_limit_rules[0]", ...)
		rule: String,
		/// Offending field
		field: &'static str,
	},
	/// A duration field above the supported maximum
	OutOfRange {
		rule: String,
		field: &'static str,
		/// Largest accepted value in seconds
		max: u64,
	},
	/// Excluded method is not a valid HTTP method token
	InvalidMethod(String),
	/// The same route pattern was bound twice
	DuplicateRoute(String),
	/// Configuration source could not be read or parsed
	Load(String),
}

impl std::fmt::Display for ConfigError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ConfigError::InvalidRule { rule, field } => {
				write!(f, "Invalid {}: {} must be positive", rule, field)
			}
			ConfigError::OutOfRange { rule, field, max } => {
				write!(f, "Invalid {}: {} must be at most {} seconds", rule, field, max)
			}
			ConfigError::InvalidMethod(method) => {
				write!(f, "Invalid excluded method: {:?}", method)
			}
			ConfigError::DuplicateRoute(route) => {
				write!(f, "Route {} has more than one binding", route)
			}
			ConfigError::Load(msg) => write!(f, "Failed to load configuration: {}", msg),
		}
	}
}

impl std::error::Error for ConfigError {}

// vim: ts=4
