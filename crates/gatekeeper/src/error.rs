//! Rejection responses
//!
//! Maps engine denials to HTTP: 403 for banned origins, 429 for rate limited
//! ones, both with a `Retry-After` header in seconds.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gatekeeper_core::{Denial, DenyReason};

/// A denied request, ready to be sent back to the client
#[derive(Debug, Clone, Copy)]
pub struct Rejection(pub Denial);

impl std::fmt::Display for Rejection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.0.reason {
			DenyReason::Banned => {
				write!(f, "Banned for {}s", self.0.retry_after_secs())
			}
			DenyReason::RateLimited { .. } => {
				write!(f, "Rate limited for {}s", self.0.retry_after_secs())
			}
		}
	}
}

impl std::error::Error for Rejection {}

impl IntoResponse for Rejection {
	fn into_response(self) -> Response {
		let retry_secs = self.0.retry_after_secs();
		let mut response = match self.0.reason {
			DenyReason::Banned => {
				let body = serde_json::json!({
					"error": {
						"code": "E-BANNED",
						"message": "Access temporarily blocked due to repeated violations.",
						"details": {
							"retryAfter": retry_secs
						}
					}
				});
				(StatusCode::FORBIDDEN, Json(body)).into_response()
			}
			DenyReason::RateLimited { count, window } => {
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"limit": count,
							"windowSecs": window.as_secs(),
							"retryAfter": retry_secs
						}
					}
				});
				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
				if let Ok(val) = format!("{};w={}", count, window.as_secs()).parse() {
					response.headers_mut().insert("X-RateLimit-Limit", val);
				}
				response
			}
		};

		if let Ok(val) = retry_secs.to_string().parse() {
			response.headers_mut().insert("Retry-After", val);
		}
		response
	}
}


// vim: ts=4
