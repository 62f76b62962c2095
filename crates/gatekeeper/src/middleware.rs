//! GateKeeper Middleware
//!
//! Tower layer running the admission check before the route handler. Attach
//! it with `Router::route_layer` so the matched route pattern is available for
//! resolving route bindings; with `Router::layer` the request path is used
//! instead, which only matches bindings registered for literal paths.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use gatekeeper_core::GateKeeper;
use tower::{Layer, Service};

use crate::error::Rejection;
use crate::extract::client_origin;
use crate::reporter::{ClientOrigin, GateKeeperHandle};

/// GateKeeper middleware layer
#[derive(Clone)]
pub struct GateKeeperLayer {
	gk: Arc<GateKeeper>,
}

impl GateKeeperLayer {
	/// Create a new GateKeeper layer
	pub fn new(gk: Arc<GateKeeper>) -> Self {
		Self { gk }
	}
}

impl<S> Layer<S> for GateKeeperLayer {
	type Service = GateKeeperService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		GateKeeperService { inner, gk: self.gk.clone() }
	}
}

/// GateKeeper middleware service
#[derive(Clone)]
pub struct GateKeeperService<S> {
	inner: S,
	gk: Arc<GateKeeper>,
}

impl<S> Service<Request<Body>> for GateKeeperService<S>
where
	S: Service<Request<Body>, Response = axum::response::Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, mut req: Request<Body>) -> Self::Future {
		let gk = self.gk.clone();
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let origin = {
				let route =
					req.extensions().get::<MatchedPath>().map_or(req.uri().path(), MatchedPath::as_str);
				let binding = gk.binding(route);

				if binding.is_bypass() {
					None
				} else {
					let origin = client_origin(req.headers(), req.extensions(), gk.ip_header());
					let decision =
						gk.intercept_binding(binding, &origin, req.method().as_str(), gk.now());
					if let Some(denial) = decision.denial() {
						return Ok(Rejection(*denial).into_response());
					}
					Some(origin)
				}
			};

			// Lets handlers report the request origin
			if let Some(origin) = origin {
				req.extensions_mut().insert(ClientOrigin(origin));
			}
			req.extensions_mut().insert(GateKeeperHandle(gk));
			inner.call(req).await
		})
	}
}

// vim: ts=4
