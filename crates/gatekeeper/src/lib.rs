//! Axum integration for GateKeeper.
//!
//! Wraps routes with a tower layer that rejects banned origins (403) and
//! rate limited requests (429), and gives handlers a [`Reporter`] extractor to
//! feed the ban tracker.
//!
//! ```ignore
//! let gk = Arc::new(GateKeeper::builder(config).bypass("/health").build()?);
//! let app = Router::new()
//! 	.route("/login", post(login))
//! 	.route_layer(GateKeeperLayer::new(gk.clone()));
//! spawn_sweeper(&gk);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod error;
pub mod extract;
pub mod middleware;
pub mod reporter;
pub mod sweeper;

pub use error::Rejection;
pub use extract::client_origin;
pub use middleware::{GateKeeperLayer, GateKeeperService};
pub use reporter::{ClientOrigin, GateKeeperHandle, Reporter};
pub use sweeper::spawn_sweeper;

pub use gatekeeper_core::{
	BanRuleConfig, Decision, Denial, DenyReason, GateKeeper, GateKeeperBuilder, GateKeeperConfig,
	GateKeeperStats, RateLimitRuleConfig, UNKNOWN_ORIGIN,
};

// vim: ts=4
