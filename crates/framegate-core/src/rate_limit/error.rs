//! Rate Limiting Error Types
//!
//! Denials carry everything their HTTP responses need: 429 status,
//! `Retry-After`, the `X-RateLimit-*` family for window limits, and
//! `X-Blocked-Domain`/`X-Block-Reason` for domain blocks.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::limiter::LimitScope;

#[derive(Debug)]
pub enum LimitError {
	/// A fixed-window budget (IP or URL scope) is exhausted
	RateLimited {
		scope: LimitScope,
		limit: u32,
		/// Seconds until the window resets
		reset_secs: u64,
	},
	/// The target domain has an active block
	DomainBlocked {
		domain: Box<str>,
		reason: Box<str>,
		remaining_secs: u64,
	},
	/// The target domain crossed the spam threshold; denied without a block
	DomainThrottled {
		domain: Box<str>,
	},
}

impl std::fmt::Display for LimitError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			LimitError::RateLimited { scope, limit, reset_secs } => {
				write!(
					f,
					"Rate limited ({} scope, {} per window), retry in {}s",
					scope.as_str(),
					limit,
					reset_secs
				)
			}
			LimitError::DomainBlocked { domain, reason, remaining_secs } => {
				write!(f, "Domain {} blocked ({}), {}s remaining", domain, reason, remaining_secs)
			}
			LimitError::DomainThrottled { domain } => {
				write!(f, "Domain {} is being throttled", domain)
			}
		}
	}
}

impl std::error::Error for LimitError {}

impl IntoResponse for LimitError {
	fn into_response(self) -> Response {
		match self {
			LimitError::RateLimited { scope, limit, reset_secs } => {
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"scope": scope.as_str(),
							"retryAfter": 60
						}
					}
				});

				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
				let headers = response.headers_mut();
				// Fixed 60s advisory regardless of where in the window we are
				if let Ok(val) = "60".parse() {
					headers.insert("Retry-After", val);
				}
				if let Ok(val) = limit.to_string().parse() {
					headers.insert("X-RateLimit-Limit", val);
				}
				if let Ok(val) = "0".parse() {
					headers.insert("X-RateLimit-Remaining", val);
				}
				if let Ok(val) = reset_secs.to_string().parse() {
					headers.insert("X-RateLimit-Reset", val);
				}
				response
			}
			LimitError::DomainBlocked { domain, reason, remaining_secs } => {
				let minutes = remaining_secs.div_ceil(60);
				let body = serde_json::json!({
					"error": {
						"code": "E-DOMAIN-BLOCKED",
						"message": format!(
							"This site is temporarily blocked ({}). Try again in about {} minute{}.",
							reason,
							minutes,
							if minutes == 1 { "" } else { "s" }
						),
						"details": {
							"domain": domain.as_ref(),
							"remainingSecs": remaining_secs
						}
					}
				});

				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
				let headers = response.headers_mut();
				if let Ok(val) = domain.parse() {
					headers.insert("X-Blocked-Domain", val);
				}
				if let Ok(val) = reason.parse() {
					headers.insert("X-Block-Reason", val);
				}
				if let Ok(val) = remaining_secs.to_string().parse() {
					headers.insert("Retry-After", val);
				}
				response
			}
			LimitError::DomainThrottled { domain } => {
				let body = serde_json::json!({
					"error": {
						"code": "E-DOMAIN-THROTTLED",
						"message": format!(
							"Requests to {} are coming in too fast. Slow down.",
							domain
						)
					}
				});
				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
				if let Ok(val) = "60".parse() {
					response.headers_mut().insert("Retry-After", val);
				}
				response
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rate_limited_headers() {
		let err = LimitError::RateLimited { scope: LimitScope::Url, limit: 10, reset_secs: 42 };
		let resp = err.into_response();
		assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(resp.headers().get("Retry-After").unwrap(), "60");
		assert_eq!(resp.headers().get("X-RateLimit-Limit").unwrap(), "10");
		assert_eq!(resp.headers().get("X-RateLimit-Remaining").unwrap(), "0");
		assert_eq!(resp.headers().get("X-RateLimit-Reset").unwrap(), "42");
	}

	#[test]
	fn test_domain_blocked_headers() {
		let err = LimitError::DomainBlocked {
			domain: "spam.example.net".into(),
			reason: "aggressive spam".into(),
			remaining_secs: 599,
		};
		let resp = err.into_response();
		assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(resp.headers().get("X-Blocked-Domain").unwrap(), "spam.example.net");
		assert_eq!(resp.headers().get("X-Block-Reason").unwrap(), "aggressive spam");
	}
}

// vim: ts=4
