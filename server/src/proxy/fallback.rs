//! Failure fallback engine
//!
//! Upstream failures on sub-resources must not break the embedding page:
//! a missing icon becomes an inline SVG, a 403'd font comes from a
//! mirror, a dead script becomes a typed stub. Only failures with no
//! applicable policy propagate their upstream status.

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use url::Url;

use super::asset::AssetClass;
use super::fetch::Fetcher;
use crate::prelude::*;
use crate::proxy::resolve::UrlResolver;

/// Google-Fonts mirrors for fonts commonly blocked at their origin,
/// matched by filename substring
const FONT_MIRRORS: &[(&str, &str)] = &[
	("lato", "https://fonts.gstatic.com/s/lato/v24/S6uyw4BMUTPHjx4wXiWtFCc.woff2"),
	("roboto", "https://fonts.gstatic.com/s/roboto/v30/KFOmCnqEu92Fr1Mu4mxK.woff2"),
];

const ARROW_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24" fill="none" stroke="#666" stroke-width="2"><path d="M5 12h14M13 6l6 6-6 6"/></svg>"##;

const SEARCH_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24" fill="none" stroke="#666" stroke-width="2"><circle cx="10" cy="10" r="7"/><path d="M15 15l6 6"/></svg>"##;

const FACEBOOK_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24" fill="#4267B2"><path d="M15 3h3V0h-3c-2.8 0-5 2.2-5 5v3H7v3h3v13h3V11h3l1-3h-4V5c0-1.1.9-2 2-2z"/></svg>"##;

const TWITTER_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24" fill="#1DA1F2"><path d="M23 5c-.8.4-1.7.6-2.6.8a4.5 4.5 0 0 0-7.7 4.1A12.8 12.8 0 0 1 3.4 4.6a4.5 4.5 0 0 0 1.4 6 4.4 4.4 0 0 1-2-.5v.1a4.5 4.5 0 0 0 3.6 4.4 4.6 4.6 0 0 1-2 .1 4.5 4.5 0 0 0 4.2 3.1A9 9 0 0 1 2 19.6a12.7 12.7 0 0 0 6.9 2c8.3 0 12.8-6.9 12.8-12.8v-.6c.9-.6 1.6-1.4 2.3-2.2z"/></svg>"##;

const INSTAGRAM_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24" fill="none" stroke="#C13584" stroke-width="2"><rect x="3" y="3" width="18" height="18" rx="5"/><circle cx="12" cy="12" r="4"/><circle cx="17.5" cy="6.5" r="1" fill="#C13584"/></svg>"##;

const GENERIC_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24" fill="none" stroke="#999" stroke-width="2"><circle cx="12" cy="12" r="9"/><path d="M8 12h8"/></svg>"##;

const PLACEHOLDER_IMAGE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 150" width="200" height="150"><rect width="200" height="150" fill="#f0f0f0" stroke="#ccc"/><path d="M70 95l25-30 20 22 12-12 18 20H70z" fill="#ccc"/><circle cx="80" cy="55" r="9" fill="#ccc"/><text x="100" y="135" text-anchor="middle" font-family="sans-serif" font-size="13" fill="#999">Image</text></svg>"##;

/// Try to produce a substitute for a failed upstream response. `None`
/// means no policy applies and the caller propagates the status.
pub async fn recover(
	fetcher: &Fetcher,
	resolver: &UrlResolver,
	status: StatusCode,
	target: &Url,
	class: AssetClass,
) -> Option<Response> {
	let path = target.path().to_ascii_lowercase();

	match (status, class) {
		(StatusCode::FORBIDDEN, AssetClass::Font) => {
			Some(font_fallback(fetcher, resolver, target).await)
		}
		(StatusCode::FORBIDDEN, AssetClass::Image) => Some(icon_for(&path)),
		(StatusCode::NOT_FOUND, AssetClass::Image) => Some(svg_response(PLACEHOLDER_IMAGE)),
		(StatusCode::NOT_FOUND, AssetClass::Script) => {
			Some(stub_response("// File not found", "application/javascript; charset=utf-8"))
		}
		(StatusCode::NOT_FOUND, AssetClass::Style) => {
			Some(stub_response("/* File not found */", "text/css; charset=utf-8"))
		}
		(StatusCode::NOT_FOUND, _) if path.ends_with(".br") => {
			Some(stub_response("", "application/octet-stream"))
		}
		_ => None,
	}
}

/// Fonts 403'd at their origin: try the mirror matched by filename,
/// fall back to an explicitly empty font body
async fn font_fallback(fetcher: &Fetcher, resolver: &UrlResolver, target: &Url) -> Response {
	let filename = target.path().rsplit('/').next().unwrap_or_default().to_ascii_lowercase();

	for (needle, mirror) in FONT_MIRRORS {
		if !filename.contains(needle) {
			continue;
		}
		let Ok(mirror_url) = Url::parse(mirror) else { continue };
		match fetcher
			.fetch(resolver, Method::GET, &mirror_url, AssetClass::Font, Bytes::new(), None)
			.await
		{
			Ok(upstream) if upstream.status.is_success() => {
				debug!("Font fallback served from mirror for {}", target);
				return font_body_response(upstream.body);
			}
			Ok(upstream) => {
				warn!("Font mirror returned {} for {}", upstream.status, target);
			}
			Err(err) => {
				warn!("Font mirror fetch failed for {}: {}", target, err);
			}
		}
	}

	empty_font_response()
}

fn font_body_response(body: Bytes) -> Response {
	let mut response = Response::new(Body::from(body));
	let headers = response.headers_mut();
	headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("font/woff2"));
	headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));
	headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	response
}

/// An empty but well-formed font response; layout falls back to the
/// next font in the stack instead of erroring
pub fn empty_font_response() -> Response {
	let mut response = Response::new(Body::empty());
	let headers = response.headers_mut();
	headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("font/woff2"));
	headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
	headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	response
}

/// Pick the icon whose name appears in the blocked URL
fn icon_for(path: &str) -> Response {
	let svg = if path.contains("arrow") {
		ARROW_ICON
	} else if path.contains("search") {
		SEARCH_ICON
	} else if path.contains("facebook") {
		FACEBOOK_ICON
	} else if path.contains("twitter") {
		TWITTER_ICON
	} else if path.contains("instagram") {
		INSTAGRAM_ICON
	} else {
		GENERIC_ICON
	};
	svg_response(svg)
}

fn svg_response(svg: &'static str) -> Response {
	let mut response = Response::new(Body::from(svg));
	let headers = response.headers_mut();
	headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"));
	headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));
	headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	response
}

fn stub_response(body: &'static str, content_type: &'static str) -> Response {
	let mut response = Response::new(Body::from(body));
	let headers = response.headers_mut();
	if let Ok(ct) = HeaderValue::from_str(content_type) {
		headers.insert(header::CONTENT_TYPE, ct);
	}
	headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	response
}

/// Benign substitute for network-level failures. Broken best-effort
/// sub-resources (ads, trackers, dead game servers) must not surface as
/// page-breaking 5xx errors to the embedding page.
pub fn network_failure_stub() -> Response {
	stub_response("// upstream unavailable", "application/javascript; charset=utf-8")
}

/// Suppressed-tracker response: a 200 script stub where a script is
/// expected, 204 otherwise, so dependent pages do not break visibly
pub fn tracker_stub(class: AssetClass) -> Response {
	match class {
		AssetClass::Script => stub_response("", "application/javascript; charset=utf-8"),
		_ => {
			let mut response = Response::new(Body::empty());
			*response.status_mut() = StatusCode::NO_CONTENT;
			response
				.headers_mut()
				.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
			response
		}
	}
}

/// Pass an unhandled upstream status through with a descriptive body
pub fn status_passthrough(status: StatusCode) -> Response {
	let mut response = Response::new(Body::from(format!(
		"Upstream responded with {}",
		status.as_u16()
	)));
	*response.status_mut() = status;
	response
		.headers_mut()
		.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
	response
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_icon_selection() {
		let resp = icon_for("/icons/arrow-left.svg");
		assert_eq!(resp.status(), StatusCode::OK);
		let resp = icon_for("/social/facebook.svg");
		assert_eq!(resp.status(), StatusCode::OK);
		let resp = icon_for("/whatever.svg");
		assert_eq!(resp.status(), StatusCode::OK);
	}

	#[test]
	fn test_empty_font_has_explicit_zero_length() {
		let resp = empty_font_response();
		assert_eq!(resp.status(), StatusCode::OK);
		assert_eq!(resp.headers().get(header::CONTENT_LENGTH).unwrap(), "0");
		assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "font/woff2");
	}

	#[test]
	fn test_tracker_stub_by_expected_type() {
		let script = tracker_stub(AssetClass::Script);
		assert_eq!(script.status(), StatusCode::OK);
		let pixel = tracker_stub(AssetClass::Image);
		assert_eq!(pixel.status(), StatusCode::NO_CONTENT);
	}

	#[test]
	fn test_status_passthrough_describes_status() {
		let resp = status_passthrough(StatusCode::IM_A_TEAPOT);
		assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
	}
}

// vim: ts=4
