//! Proxy route handlers
//!
//! One handler per method on the proxy route. GET runs the full
//! pipeline; POST forwards the body and returns the upstream response
//! verbatim; HEAD validates URL syntax without an outbound fetch;
//! OPTIONS answers the CORS preflight statically.

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use super::asset::{self, AssetClass};
use super::fallback;
use super::resolve::UrlResolver;
use super::rewrite;
use crate::prelude::*;

/// Pull the raw (still percent-encoded) `url` parameter out of the query
/// string. Everything after `url=` belongs to the target, including any
/// stray `&` an unencoded caller left in.
fn raw_url_param(query: Option<&str>) -> Option<&str> {
	let query = query?;
	let mut search = 0;
	loop {
		let idx = query[search..].find("url=")? + search;
		if idx == 0 || query.as_bytes()[idx - 1] == b'&' {
			let value = &query[idx + 4..];
			return if value.is_empty() { None } else { Some(value) };
		}
		search = idx + 4;
	}
}

pub async fn proxy_get(
	State(app): State<App>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
) -> Response {
	let Some(raw) = raw_url_param(query.as_deref()) else {
		return Error::InvalidUrl("missing url parameter".into()).into_response();
	};
	let decoded = UrlResolver::decode(raw);

	// Per-resource budget, keyed by the decoded target string
	if let Err(err) = app.limiter.check_url(&decoded, &Method::GET) {
		return err.into_response();
	}

	let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
	let user_agent = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok());

	let target = match app.resolver.resolve(&decoded, referer, user_agent) {
		Ok(target) => target,
		Err(err) => return err.into_response(),
	};
	let class = asset::classify(&target);
	let host = target.host_str().unwrap_or_default().to_string();

	if UrlResolver::is_tracker(&host) {
		debug!("Suppressed tracker request for {}", host);
		return fallback::tracker_stub(class);
	}

	if let Err(err) = app.domain_guard.check(&host) {
		info!("Domain check rejected {}: {}", host, err);
		return err.into_response();
	}

	let upstream = match app
		.fetcher
		.fetch(&app.resolver, Method::GET, &target, class, Bytes::new(), None)
		.await
	{
		Ok(upstream) => upstream,
		Err(Error::Timeout) | Err(Error::NetworkError(_)) => {
			// A broken best-effort sub-resource must not take the whole
			// embedding page down with a 5xx
			warn!("Upstream fetch failed for {}, serving stub", target);
			return fallback::network_failure_stub();
		}
		Err(err) => return err.into_response(),
	};

	if !upstream.status.is_success() {
		if let Some(substitute) =
			fallback::recover(&app.fetcher, &app.resolver, upstream.status, &target, class).await
		{
			info!("Fallback substitute for {} ({})", target, upstream.status);
			return substitute;
		}
		return fallback::status_passthrough(upstream.status);
	}

	rewrite::transform(&target, class, upstream)
}

pub async fn proxy_post(
	State(app): State<App>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
	body: Bytes,
) -> Response {
	let Some(raw) = raw_url_param(query.as_deref()) else {
		return Error::InvalidUrl("missing url parameter".into()).into_response();
	};
	let decoded = UrlResolver::decode(raw);

	if let Err(err) = app.limiter.check_url(&decoded, &Method::POST) {
		return err.into_response();
	}

	// No relative-URL heuristics on POST; the target must be absolute
	let target = match app.resolver.resolve(&decoded, None, None) {
		Ok(target) => target,
		Err(err) => return err.into_response(),
	};
	let host = target.host_str().unwrap_or_default().to_string();

	if UrlResolver::is_tracker(&host) {
		return fallback::tracker_stub(AssetClass::Data);
	}

	if let Err(err) = app.domain_guard.check(&host) {
		return err.into_response();
	}

	let content_type = headers.get(header::CONTENT_TYPE);
	let upstream = match app
		.fetcher
		.fetch(&app.resolver, Method::POST, &target, AssetClass::Data, body, content_type)
		.await
	{
		Ok(upstream) => upstream,
		Err(err) => return err.into_response(),
	};

	// Upstream status and body pass through verbatim; 204 stays bodiless
	let mut response = if upstream.status == StatusCode::NO_CONTENT {
		Response::new(Body::empty())
	} else {
		Response::new(Body::from(upstream.body))
	};
	*response.status_mut() = upstream.status;
	let response_headers = response.headers_mut();
	if let Some(ct) = upstream.headers.get(header::CONTENT_TYPE) {
		response_headers.insert(header::CONTENT_TYPE, ct.clone());
	}
	response_headers
		.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	response
}

/// Lightweight URL-syntax validation; no outbound fetch
pub async fn proxy_head(State(app): State<App>, RawQuery(query): RawQuery) -> Response {
	let Some(raw) = raw_url_param(query.as_deref()) else {
		return StatusCode::BAD_REQUEST.into_response();
	};
	let decoded = UrlResolver::decode(raw);
	match app.resolver.resolve(&decoded, None, None) {
		Ok(_) => StatusCode::OK.into_response(),
		Err(err) => err.into_response(),
	}
}

/// Static CORS preflight response
pub async fn proxy_options() -> Response {
	let mut response = Response::new(Body::empty());
	*response.status_mut() = StatusCode::NO_CONTENT;
	let headers = response.headers_mut();
	headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	headers.insert(
		header::ACCESS_CONTROL_ALLOW_METHODS,
		HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS, HEAD"),
	);
	headers.insert(
		header::ACCESS_CONTROL_ALLOW_HEADERS,
		HeaderValue::from_static("Content-Type, Authorization"),
	);
	headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
	response
}


// vim: ts=4
