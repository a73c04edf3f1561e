//! Client address extraction
//!
//! Resolves the client IP used for rate-limit keying. In `Standalone`
//! mode the peer address is authoritative; behind the platform edge
//! (`Proxy` mode) the forwarding headers are consulted first.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use hyper::Request;

/// How the server is deployed relative to the platform edge
#[derive(Debug, Clone, Copy)]
pub enum ServerMode {
	Standalone,
	Proxy,
}

/// Extract client IP from request based on ServerMode
pub fn extract_client_ip<B>(req: &Request<B>, mode: &ServerMode) -> Option<IpAddr> {
	match mode {
		ServerMode::Standalone => {
			req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip())
		}
		ServerMode::Proxy => extract_from_xff(req)
			.or_else(|| extract_from_x_real_ip(req))
			.or_else(|| extract_from_forwarded(req))
			.or_else(|| req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip())),
	}
}

/// Extract IP from X-Forwarded-For header
fn extract_from_xff<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-forwarded-for")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| {
			// X-Forwarded-For can contain multiple IPs: "client, proxy1, proxy2"
			// Take the first (leftmost) IP as the original client
			s.split(',').next().map(|ip| ip.trim()).and_then(|ip| ip.parse().ok())
		})
}

/// Extract IP from X-Real-IP header
fn extract_from_x_real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-real-ip")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.trim().parse().ok())
}

/// Extract IP from Forwarded header (RFC 7239)
fn extract_from_forwarded<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers().get("forwarded").and_then(|h| h.to_str().ok()).and_then(|s| {
		// Forwarded header format: "for=192.0.2.60;proto=http;by=203.0.113.43"
		// or with IPv6: "for=\"[2001:db8::1]\""
		s.split(';')
			.find(|part| part.trim().to_lowercase().starts_with("for="))
			.and_then(|for_part| {
				let value = for_part
					.trim()
					.strip_prefix("for=")
					.or_else(|| for_part.trim().strip_prefix("FOR="))?;
				let cleaned = value.trim_matches('"').trim_matches('[').trim_matches(']');
				cleaned.parse().ok()
			})
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;

	fn request_with_header(name: &str, value: &str) -> Request<Body> {
		let mut req = Request::new(Body::empty());
		req.headers_mut().insert(
			hyper::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
			value.parse().unwrap(),
		);
		req
	}

	#[test]
	fn test_xff_first_ip_wins() {
		let req = request_with_header("x-forwarded-for", "203.0.113.7, 10.0.0.1");
		let ip = extract_client_ip(&req, &ServerMode::Proxy);
		assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
	}

	#[test]
	fn test_x_real_ip_fallback() {
		let req = request_with_header("x-real-ip", "198.51.100.4");
		let ip = extract_client_ip(&req, &ServerMode::Proxy);
		assert_eq!(ip, Some("198.51.100.4".parse().unwrap()));
	}

	#[test]
	fn test_forwarded_quoted_ipv6() {
		let req = request_with_header("forwarded", "for=\"[2001:db8::1]\";proto=https");
		let ip = extract_client_ip(&req, &ServerMode::Proxy);
		assert_eq!(ip, Some("2001:db8::1".parse().unwrap()));
	}

	#[test]
	fn test_standalone_ignores_headers() {
		let req = request_with_header("x-forwarded-for", "203.0.113.7");
		// No ConnectInfo extension in a bare test request
		assert_eq!(extract_client_ip(&req, &ServerMode::Standalone), None);
	}
}

// vim: ts=4
