//! Report extractor
//!
//! Handlers behind the GateKeeper middleware take a [`Reporter`] to flag the
//! current request's origin, e.g. after a failed login.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use gatekeeper_core::GateKeeper;
use tracing::error;

use crate::extract::client_origin;

/// Engine handle placed in request extensions by the middleware
#[derive(Clone)]
pub struct GateKeeperHandle(pub Arc<GateKeeper>);

/// Origin the middleware already resolved for this request
#[derive(Clone, Debug)]
pub struct ClientOrigin(pub String);

/// Reports the origin of the current request
#[derive(Clone)]
pub struct Reporter {
	gk: Arc<GateKeeper>,
	origin: String,
}

impl Reporter {
	pub fn origin(&self) -> &str {
		&self.origin
	}

	/// Register a report. Returns true when it banned the origin.
	pub fn report(&self) -> bool {
		self.gk.report(&self.origin)
	}
}

impl std::fmt::Debug for Reporter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Reporter").field("origin", &self.origin).finish_non_exhaustive()
	}
}

impl<S> FromRequestParts<S> for Reporter
where
	S: Send + Sync,
{
	type Rejection = StatusCode;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let Some(GateKeeperHandle(gk)) = parts.extensions.get::<GateKeeperHandle>().cloned() else {
			error!("Reporter used on a route without the GateKeeper middleware");
			return Err(StatusCode::INTERNAL_SERVER_ERROR);
		};
		// Bypassed routes skip origin resolution in the middleware
		let origin = match parts.extensions.get::<ClientOrigin>() {
			Some(ClientOrigin(origin)) => origin.clone(),
			None => client_origin(&parts.headers, &parts.extensions, gk.ip_header()),
		};
		Ok(Reporter { gk, origin })
	}
}

// vim: ts=4
