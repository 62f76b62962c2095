//! Client Origin Extraction
//!
//! The origin is the value of the configured proxy header, or the peer IP of
//! the connection when no header is configured. Values are used verbatim.
//!
//! When the origin cannot be determined the request is attributed to
//! [`UNKNOWN_ORIGIN`]. All such requests share one quota and one ban state:
//! a proxy that stops sending the configured header makes every client behind
//! it look like the same origin.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use gatekeeper_core::UNKNOWN_ORIGIN;
use tracing::warn;

/// Resolve the origin from request headers and extensions
pub fn client_origin(headers: &HeaderMap, extensions: &Extensions, ip_header: Option<&str>) -> String {
	match ip_header {
		Some(name) => from_header(headers, name).unwrap_or_else(|| {
			warn!("Missing or unreadable {} header, using origin {:?}", name, UNKNOWN_ORIGIN);
			UNKNOWN_ORIGIN.to_string()
		}),
		None => from_peer(extensions).unwrap_or_else(|| {
			warn!("No peer address available, using origin {:?}", UNKNOWN_ORIGIN);
			UNKNOWN_ORIGIN.to_string()
		}),
	}
}

fn from_header(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.filter(|value| !value.is_empty())
		.map(str::to_string)
}

/// Peer IP from `ConnectInfo` (requires `into_make_service_with_connect_info`)
fn from_peer(extensions: &Extensions) -> Option<String> {
	extensions.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip().to_string())
}


// vim: ts=4
