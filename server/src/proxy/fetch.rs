//! Upstream fetcher
//!
//! Issues the outbound request with a browser-plausible header profile.
//! Asset-class-specific Accept/Sec-Fetch values matter: upstreams that
//! inspect these for bot detection must see a coherent picture, or they
//! serve 403s for perfectly ordinary font and image loads. Redirects are
//! followed manually so every hop re-passes the safety gate.

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use url::Url;

use super::asset::AssetClass;
use crate::config::Config;
use crate::prelude::*;
use crate::proxy::resolve::UrlResolver;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
	(KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 5;

/// Substrings marking hosts that serve long-loading browser games
const GAME_HOST_MARKERS: &[&str] = &["game", "agar", "slither", "diep"];

/// A fully collected upstream response
pub struct UpstreamResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

type HttpsClient =
	Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

pub struct Fetcher {
	client: HttpsClient,
	fetch_timeout: Duration,
	game_fetch_timeout: Duration,
}

impl Fetcher {
	pub fn new(opts: &Config) -> FgResult<Self> {
		let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
			.with_native_roots()
			.map_err(|_| Error::ConfigError("no native root CA certificates found".into()))?
			.https_or_http()
			.enable_http1()
			.enable_http2()
			.build();
		let client = Client::builder(TokioExecutor::new())
			.pool_idle_timeout(Duration::from_secs(30))
			.build(https_connector);
		Ok(Self {
			client,
			fetch_timeout: opts.fetch_timeout,
			game_fetch_timeout: opts.game_fetch_timeout,
		})
	}

	/// Deadline for this target. Game asset loads run long and must not
	/// be killed prematurely; ordinary pages fail fast.
	pub fn deadline(&self, target: &Url) -> Duration {
		if is_game_host(target) {
			self.game_fetch_timeout
		} else {
			self.fetch_timeout
		}
	}

	/// Fetch `target`, following redirects. Each hop re-passes the gate
	/// so an upstream cannot redirect the proxy into private space.
	pub async fn fetch(
		&self,
		resolver: &UrlResolver,
		method: Method,
		target: &Url,
		class: AssetClass,
		body: Bytes,
		content_type: Option<&HeaderValue>,
	) -> FgResult<UpstreamResponse> {
		let deadline = self.deadline(target);
		let result = tokio::time::timeout(
			deadline,
			self.fetch_inner(resolver, method, target.clone(), class, body, content_type),
		)
		.await;
		match result {
			Ok(inner) => inner,
			Err(_) => Err(Error::Timeout),
		}
	}

	async fn fetch_inner(
		&self,
		resolver: &UrlResolver,
		mut method: Method,
		mut target: Url,
		class: AssetClass,
		body: Bytes,
		content_type: Option<&HeaderValue>,
	) -> FgResult<UpstreamResponse> {
		let mut body = Some(body);

		for _hop in 0..=MAX_REDIRECTS {
			let uri: Uri = target
				.as_str()
				.parse()
				.map_err(|_| Error::InvalidUrl("target is not a valid URI".into()))?;

			let mut builder = hyper::Request::builder().method(method.clone()).uri(uri);
			if let Some(headers) = builder.headers_mut() {
				*headers = upstream_headers(&target, class);
				if method == Method::POST {
					if let Some(ct) = content_type {
						headers.insert(hyper::header::CONTENT_TYPE, ct.clone());
					}
				}
			}

			let payload = if method == Method::POST {
				body.clone().unwrap_or_default()
			} else {
				Bytes::new()
			};
			let request = builder
				.body(Full::new(payload))
				.map_err(|err| Error::Internal(format!("failed to build upstream request: {}", err)))?;

			let response = self.client.request(request).await.map_err(map_client_error)?;
			let (parts, incoming) = response.into_parts();

			if parts.status.is_redirection() {
				if let Some(location) =
					parts.headers.get(hyper::header::LOCATION).and_then(|l| l.to_str().ok())
				{
					target = target
						.join(location)
						.map_err(|err| Error::InvalidUrl(format!("bad redirect target: {}", err)))?;
					resolver.ensure_allowed(&target)?;
					if parts.status == StatusCode::SEE_OTHER {
						method = Method::GET;
						body = None;
					}
					debug!("Following redirect to {}", target);
					continue;
				}
			}

			let collected = incoming
				.collect()
				.await
				.map_err(|err| Error::NetworkError(format!("body read failed: {}", err)))?;
			return Ok(UpstreamResponse {
				status: parts.status,
				headers: parts.headers,
				body: collected.to_bytes(),
			});
		}

		Err(Error::NetworkError("too many redirects".into()))
	}
}

/// Classify a transport error. DNS failures and refused connections get
/// distinct messages because the fallback engine logs them differently.
fn map_client_error(err: hyper_util::client::legacy::Error) -> Error {
	let msg = err.to_string();
	if msg.contains("dns") || msg.contains("resolve") {
		Error::NetworkError(format!("dns lookup failed: {}", msg))
	} else if msg.contains("refused") {
		Error::NetworkError(format!("connection refused: {}", msg))
	} else {
		Error::NetworkError(msg)
	}
}

/// Game-host heuristic: `.io` domains and well-known game name markers
pub fn is_game_host(target: &Url) -> bool {
	let host = target.host_str().unwrap_or_default().to_ascii_lowercase();
	if host.ends_with(".io") {
		return true;
	}
	let full = target.as_str().to_ascii_lowercase();
	GAME_HOST_MARKERS.iter().any(|m| host.contains(m) || full.contains(m))
}

/// Browser-mimicking headers, tuned per asset class
pub fn upstream_headers(target: &Url, class: AssetClass) -> HeaderMap {
	let mut headers = HeaderMap::new();
	let origin = format!("{}://{}", target.scheme(), target.host_str().unwrap_or_default());

	headers.insert(hyper::header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
	headers.insert(
		hyper::header::ACCEPT_LANGUAGE,
		HeaderValue::from_static("en-US,en;q=0.9"),
	);
	headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
	if let Ok(referer) = HeaderValue::from_str(&format!("{}/", origin)) {
		headers.insert(hyper::header::REFERER, referer);
	}

	let (accept, dest, mode, site) = match class {
		AssetClass::Document => (
			"text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
			"document",
			"navigate",
			"none",
		),
		AssetClass::Script => ("*/*", "script", "no-cors", "cross-site"),
		AssetClass::Style => ("text/css,*/*;q=0.1", "style", "no-cors", "cross-site"),
		AssetClass::Font => ("*/*", "font", "cors", "cross-site"),
		AssetClass::Image => (
			"image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8",
			"image",
			"no-cors",
			"cross-site",
		),
		AssetClass::Data | AssetClass::Binary => ("*/*", "empty", "cors", "cross-site"),
	};
	headers.insert(hyper::header::ACCEPT, HeaderValue::from_static(accept));
	headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static(dest));
	headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static(mode));
	headers.insert(HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static(site));
	if matches!(class, AssetClass::Document) {
		headers.insert(
			HeaderName::from_static("sec-fetch-user"),
			HeaderValue::from_static("?1"),
		);
		headers.insert(
			HeaderName::from_static("upgrade-insecure-requests"),
			HeaderValue::from_static("1"),
		);
	}
	if matches!(class, AssetClass::Font) {
		if let Ok(value) = HeaderValue::from_str(&origin) {
			headers.insert(hyper::header::ORIGIN, value);
		}
	}

	// Rewritten bodies must arrive as plaintext; pass-through classes
	// may keep upstream encoding (the Content-Encoding header travels
	// with the body)
	let encoding = match class {
		AssetClass::Document | AssetClass::Style | AssetClass::Script | AssetClass::Data => {
			"identity"
		}
		_ => "gzip, deflate, br",
	};
	headers.insert(hyper::header::ACCEPT_ENCODING, HeaderValue::from_static(encoding));

	headers
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url(s: &str) -> Url {
		Url::parse(s).unwrap()
	}

	#[test]
	fn test_game_host_heuristic() {
		assert!(is_game_host(&url("https://venge.io/play")));
		assert!(is_game_host(&url("https://agarmirror.example.com/")));
		assert!(is_game_host(&url("https://cdn.example.com/games/asset.png")));
		assert!(!is_game_host(&url("https://example.com/news")));
	}

	#[test]
	fn test_document_profile() {
		let headers = upstream_headers(&url("https://example.com/"), AssetClass::Document);
		assert_eq!(headers.get("sec-fetch-dest").unwrap(), "document");
		assert_eq!(headers.get("sec-fetch-mode").unwrap(), "navigate");
		assert_eq!(headers.get("upgrade-insecure-requests").unwrap(), "1");
		assert_eq!(headers.get("accept-encoding").unwrap(), "identity");
		assert!(headers.get(hyper::header::ACCEPT).unwrap().to_str().unwrap().contains("text/html"));
	}

	#[test]
	fn test_font_profile_carries_origin() {
		let headers = upstream_headers(&url("https://example.com/f/Lato.woff2"), AssetClass::Font);
		assert_eq!(headers.get("sec-fetch-dest").unwrap(), "font");
		assert_eq!(headers.get(hyper::header::ORIGIN).unwrap(), "https://example.com");
	}

	#[test]
	fn test_referer_is_target_origin() {
		let headers = upstream_headers(&url("https://example.com/deep/page"), AssetClass::Image);
		assert_eq!(headers.get(hyper::header::REFERER).unwrap(), "https://example.com/");
	}
}

// vim: ts=4
