//! Crate-wide error type
//!
//! One shared enum for the whole service. Validation and safety failures
//! are terminal and map straight to a status code; upstream and network
//! failures are usually absorbed by the fallback engine before they ever
//! reach `IntoResponse`.

use axum::http::StatusCode;
use axum::response::IntoResponse;

pub type FgResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Malformed or unresolvable target URL
	InvalidUrl(String),
	/// Disallowed protocol, private address, or self-referential target
	ForbiddenTarget(String),
	NotFound,
	/// Upstream fetch exceeded its deadline
	Timeout,
	/// DNS failure, connection refused, or other transport-level failure
	NetworkError(String),
	ConfigError(String),
	ValidationError(String),
	Internal(String),

	// externals
	Io(std::io::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
			Error::ForbiddenTarget(msg) => write!(f, "forbidden target: {}", msg),
			Error::NotFound => write!(f, "not found"),
			Error::Timeout => write!(f, "upstream timeout"),
			Error::NetworkError(msg) => write!(f, "network error: {}", msg),
			Error::ConfigError(msg) => write!(f, "config error: {}", msg),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		match self {
			Error::InvalidUrl(msg) => {
				(StatusCode::BAD_REQUEST, format!("Invalid URL: {}", msg)).into_response()
			}
			Error::ForbiddenTarget(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
			Error::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
			Error::Timeout => {
				(StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
			}
			Error::NetworkError(msg) => {
				(StatusCode::BAD_GATEWAY, format!("Upstream unreachable: {}", msg)).into_response()
			}
			// No internal detail leaks to the caller
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		let resp = Error::InvalidUrl("no host".into()).into_response();
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

		let resp = Error::ForbiddenTarget("private address".into()).into_response();
		assert_eq!(resp.status(), StatusCode::FORBIDDEN);

		let resp = Error::Timeout.into_response();
		assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

		let resp = Error::Internal("details".into()).into_response();
		assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn test_internal_detail_not_leaked() {
		let msg = format!("{}", Error::Internal("secret path".into()));
		assert!(msg.contains("secret path"));
		// Display keeps the detail for logs; the response body must not
		let resp = Error::Internal("secret path".into()).into_response();
		assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}
}

// vim: ts=4
