//! Origin tracking and admission decisions for GateKeeper.
//!
//! This crate holds the request-admission engine without any HTTP framework
//! dependency: sliding-window rate counters, the report-driven ban tracker,
//! route rule bindings and the memory reclamation sweep. The axum integration
//! lives in the `gatekeeper` crate.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod ban;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod route;
pub mod rule;
pub mod state;
pub mod stats;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BanRuleConfig, GateKeeperConfig, RateLimitRuleConfig, MAX_SECS};
pub use engine::{Decision, Denial, DenyReason, GateKeeper, GateKeeperBuilder};
pub use error::{ConfigError, ConfigResult};
pub use route::RouteBinding;
pub use rule::{BanRule, RateRule, RuleId};
pub use stats::GateKeeperStats;

/// Origin used when the client identity cannot be read from the request.
///
/// Every client that falls back to this value shares a single quota and a
/// single ban state, so a proxy that drops the configured header collapses
/// all of its clients into one origin.
pub const UNKNOWN_ORIGIN: &str = "unknown";

// vim: ts=4
