//! Response transformation
//!
//! Content-type-specific post-processing of upstream responses. HTML is
//! rewritten and gets the script runtime; CSS gets its `url()`
//! references rewritten; JS and binary pass through untouched. HTML is
//! never cacheable (rewriting reflects the current deployment); assets
//! are cached aggressively since they are addressed by origin URL.

pub mod css;
pub mod html;
pub mod inject;

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use url::Url;

use super::asset::{self, AssetClass};
use super::fetch::UpstreamResponse;
use super::PROXY_ROUTE;

pub use css::rewrite_css;
pub use html::rewrite_html;
pub use inject::inject_runtime;

/// Proxy URL for an absolute target
pub fn proxy_url(absolute: &str) -> String {
	format!("{}?url={}", PROXY_ROUTE, urlencoding::encode(absolute))
}

/// ASCII-case-insensitive substring search from `from`. Byte indices
/// stay valid for slicing because the needles are ASCII.
pub(crate) fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
	let h = haystack.as_bytes();
	let n = needle.as_bytes();
	if n.is_empty() || from >= h.len() || h.len() - from < n.len() {
		return None;
	}
	(from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Transform a successful upstream response for the client
pub fn transform(target: &Url, class: AssetClass, upstream: UpstreamResponse) -> Response {
	let upstream_ct = upstream
		.headers
		.get(header::CONTENT_TYPE)
		.and_then(|v| v.to_str().ok())
		.map(str::to_string);
	let effective_ct = asset::content_type_for(target, upstream_ct.as_deref());

	let is_html = effective_ct.contains("text/html")
		|| (class == AssetClass::Document && upstream_ct.is_none());

	if is_html {
		let markup = String::from_utf8_lossy(&upstream.body);
		let rewritten = inject_runtime(&rewrite_html(&markup, target), target);
		return build_response(
			upstream.status.as_u16(),
			"text/html; charset=utf-8",
			"no-cache, no-store, must-revalidate",
			Body::from(rewritten),
			None,
		);
	}

	match class {
		AssetClass::Style => {
			let sheet = String::from_utf8_lossy(&upstream.body);
			let rewritten = rewrite_css(&sheet, target);
			build_response(
				upstream.status.as_u16(),
				"text/css; charset=utf-8",
				"public, max-age=86400",
				Body::from(rewritten),
				None,
			)
		}
		// Dynamic URL construction in scripts bypasses the proxy; the
		// injected runtime catches fetch/XHR/WebSocket, the rest is a
		// documented gap
		AssetClass::Script => build_response(
			upstream.status.as_u16(),
			"application/javascript; charset=utf-8",
			"public, max-age=86400",
			Body::from(upstream.body),
			None,
		),
		AssetClass::Data => build_response(
			upstream.status.as_u16(),
			&effective_ct,
			"no-cache",
			Body::from(upstream.body),
			None,
		),
		_ => {
			let encoding = upstream.headers.get(header::CONTENT_ENCODING).cloned();
			build_response(
				upstream.status.as_u16(),
				&effective_ct,
				"public, max-age=86400",
				Body::from(upstream.body),
				encoding,
			)
		}
	}
}

fn build_response(
	status: u16,
	content_type: &str,
	cache: &'static str,
	body: Body,
	content_encoding: Option<HeaderValue>,
) -> Response {
	let mut response = Response::new(body);
	*response.status_mut() =
		axum::http::StatusCode::from_u16(status).unwrap_or(axum::http::StatusCode::OK);
	let headers = response.headers_mut();
	if let Ok(ct) = HeaderValue::from_str(content_type) {
		headers.insert(header::CONTENT_TYPE, ct);
	}
	headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache));
	headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	if let Some(encoding) = content_encoding {
		headers.insert(header::CONTENT_ENCODING, encoding);
	}
	response
}


// vim: ts=4
