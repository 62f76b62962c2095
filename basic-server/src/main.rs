//! GateKeeper demo server
//!
//! Environment:
//! - `GATEKEEPER_CONFIG`: path of a YAML config (defaults to `gatekeeper.yaml`)
//! - `LISTEN`: listen address (defaults to `127.0.0.1:8080`)
//! - `RUST_LOG`: log filter

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use gatekeeper::{spawn_sweeper, GateKeeper, GateKeeperLayer, Reporter};
use gatekeeper_core::{ConfigError, ConfigResult, GateKeeperConfig, RateLimitRuleConfig};
use tracing::{error, info};

const DEFAULT_CONFIG: &str = "gatekeeper.yaml";
const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

async fn load_config(path: &str) -> ConfigResult<GateKeeperConfig> {
	let text = tokio::fs::read_to_string(path)
		.await
		.map_err(|err| ConfigError::Load(format!("{}: {}", path, err)))?;
	serde_yaml::from_str(&text).map_err(|err| ConfigError::Load(format!("{}: {}", path, err)))
}

fn build(config: GateKeeperConfig) -> ConfigResult<(Arc<GateKeeper>, Router)> {
	let gk = Arc::new(
		GateKeeper::builder(config)
			// Tighter limit on top of the global rules
			.specific("/specific", vec![RateLimitRuleConfig::new(1, 2)], false)
			// Looser limit replacing the global rules
			.specific("/specific-standalone", vec![RateLimitRuleConfig::new(40, 5)], true)
			.bypass("/bypass")
			.build()?,
	);

	let router = Router::new()
		.route("/ping", get(ok))
		.route("/ban", get(ban))
		.route("/specific", get(ok))
		.route("/specific-standalone", get(ok))
		.route("/bypass", get(ok))
		.route_layer(GateKeeperLayer::new(gk.clone()));

	Ok((gk, router))
}

async fn ok() -> &'static str {
	"ok"
}

async fn ban(reporter: Reporter) -> &'static str {
	if reporter.report() {
		info!("Banned {}", reporter.origin());
	}
	"ok"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_target(false)
		.init();

	let config_path = env::var("GATEKEEPER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
	let listen = env::var("LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.to_string());

	let config = load_config(&config_path).await.inspect_err(|err| error!("FATAL: {}", err))?;
	let (gk, router) = build(config).inspect_err(|err| error!("FATAL: {}", err))?;
	let _sweeper = spawn_sweeper(&gk);

	let listener = tokio::net::TcpListener::bind(&listen).await?;
	info!("Listening on HTTP {}", listen);
	axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await?;

	let stats = gk.stats();
	info!(
		"Stopped: {} rate limited, {} ban rejections, {} bans issued",
		stats.total_rate_limited, stats.total_ban_rejections, stats.total_bans_issued
	);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bundled_config_builds() {
		let config: GateKeeperConfig = serde_yaml::from_str(include_str!("../gatekeeper.yaml")).unwrap();
		assert_eq!(config.ip_header.as_deref(), Some("x-my-ip"));
		assert_eq!(config.rate_limit_rules.len(), 2);

		let (gk, _router) = build(config).unwrap();
		assert!(gk.binding("/bypass").is_bypass());
		assert!(gk.ban_rule().is_some());
	}
}

// vim: ts=4
