//! URL resolution and the safety gate
//!
//! Turns the raw `url` query parameter into a validated target. The
//! parameter may be percent-encoded and may additionally carry HTML
//! entities from a prior render pass. Relative references are
//! reconstructed from the referrer; requests originating from the shell
//! UI itself fall back to the origin-hint table. Every resolved target
//! passes the gate: protocol allowlist, self-proxy rejection,
//! CIDR-accurate private-range rejection, and tracker suppression.

use std::net::IpAddr;
use std::sync::OnceLock;

use ipnet::IpNet;
use url::Url;

use super::{asset, PROXY_ROUTE, SHELL_UI_PATHS};
use crate::prelude::*;

/// Maps a referrer/User-Agent substring to the base origin relative
/// asset paths are resolved against when the referrer is the shell UI.
/// A narrow compatibility table for embedded sites that request
/// sub-resources without a usable referrer; not general-purpose.
pub struct OriginHint {
	pub needle: &'static str,
	pub origin: &'static str,
}

pub const ORIGIN_HINTS: &[OriginHint] = &[
	OriginHint { needle: "venge", origin: "https://venge.io" },
	OriginHint { needle: "miniclip", origin: "https://www.miniclip.com" },
];

/// Hostnames whose requests are silently suppressed instead of proxied.
/// Pages embedding these keep working; the calls just go nowhere.
const TRACKER_DOMAINS: &[&str] = &[
	"google-analytics.com",
	"googletagmanager.com",
	"doubleclick.net",
	"googlesyndication.com",
	"connect.facebook.net",
	"hotjar.com",
	"mixpanel.com",
	"segment.io",
	"segment.com",
	"amplitude.com",
	"scorecardresearch.com",
	"quantserve.com",
];

pub struct UrlResolver {
	own_domains: Box<[Box<str>]>,
}

impl UrlResolver {
	pub fn new(own_domains: Box<[Box<str>]>) -> Self {
		Self { own_domains }
	}

	/// Percent-decode, then unescape HTML entities. `&amp;` is processed
	/// last so an already-unescaped `&` is not corrupted again.
	pub fn decode(raw: &str) -> String {
		let decoded = urlencoding::decode(raw).map(|c| c.into_owned()).unwrap_or_else(|_| raw.to_string());
		decoded
			.replace("&quot;", "\"")
			.replace("&#39;", "'")
			.replace("&lt;", "<")
			.replace("&gt;", ">")
			.replace("&amp;", "&")
	}

	/// Resolve the decoded target to an absolute URL and run the gate
	pub fn resolve(
		&self,
		decoded: &str,
		referer: Option<&str>,
		user_agent: Option<&str>,
	) -> FgResult<Url> {
		let url = match Url::parse(decoded) {
			Ok(url) => url,
			Err(url::ParseError::RelativeUrlWithoutBase) => {
				self.resolve_relative(decoded, referer, user_agent)?
			}
			Err(err) => return Err(Error::InvalidUrl(err.to_string())),
		};

		self.ensure_allowed(&url)?;
		Ok(url)
	}

	/// Reconstruct a relative reference using the referrer
	fn resolve_relative(
		&self,
		reference: &str,
		referer: Option<&str>,
		user_agent: Option<&str>,
	) -> FgResult<Url> {
		let Some(referer) = referer else {
			return Err(Error::InvalidUrl(format!("relative reference without referrer: {}", reference)));
		};
		let referer_url = Url::parse(referer)
			.map_err(|_| Error::InvalidUrl("unparseable referrer".into()))?;

		// Referrer is an already-proxied page: resolve against the page
		// it was proxying, not against our own origin
		if referer_url.path().starts_with(PROXY_ROUTE) {
			if let Some((_, proxied)) = referer_url.query_pairs().find(|(k, _)| k == "url") {
				if let Ok(base) = Url::parse(&proxied) {
					return base
						.join(reference)
						.map_err(|err| Error::InvalidUrl(err.to_string()));
				}
			}
		}

		// Referrer is the shell UI itself: no base origin survives the
		// embedding, so asset-looking paths go through the hint table
		let from_shell = SHELL_UI_PATHS.iter().any(|p| referer_url.path().starts_with(p));
		if from_shell {
			if looks_like_asset(reference) {
				let ua = user_agent.unwrap_or("");
				for hint in ORIGIN_HINTS {
					if referer.contains(hint.needle) || ua.contains(hint.needle) {
						if let Ok(base) = Url::parse(hint.origin) {
							return base
								.join(reference)
								.map_err(|err| Error::InvalidUrl(err.to_string()));
						}
					}
				}
			}
			return Err(Error::InvalidUrl(format!(
				"relative reference from shell UI with no origin hint: {}",
				reference
			)));
		}

		// Ordinary external referrer: its own origin is the base
		referer_url.join(reference).map_err(|err| Error::InvalidUrl(err.to_string()))
	}

	/// The safety gate: protocol, self-proxy, and private-range checks
	pub fn ensure_allowed(&self, url: &Url) -> FgResult<()> {
		match url.scheme() {
			"http" | "https" => {}
			other => {
				return Err(Error::ForbiddenTarget(format!("protocol not allowed: {}", other)));
			}
		}

		let Some(host) = url.host() else {
			return Err(Error::InvalidUrl("missing host".into()));
		};

		match host {
			url::Host::Ipv4(ip) => {
				if is_private_ip(IpAddr::V4(ip)) {
					return Err(Error::ForbiddenTarget("private address".into()));
				}
			}
			url::Host::Ipv6(ip) => {
				if is_private_ip(IpAddr::V6(ip)) {
					return Err(Error::ForbiddenTarget("private address".into()));
				}
			}
			url::Host::Domain(name) => {
				let name = name.to_ascii_lowercase();
				if name == "localhost" || name.contains("local") {
					return Err(Error::ForbiddenTarget("private address".into()));
				}
				if self.own_domains.iter().any(|d| name == d.as_ref() || name.contains(d.as_ref())) {
					return Err(Error::ForbiddenTarget("proxy cannot target itself".into()));
				}
			}
		}

		// Explicit dev-host forms with port, caught whatever the hostname
		let host_port = match url.port() {
			Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
			None => url.host_str().unwrap_or_default().to_string(),
		};
		if host_port == "localhost:3000" || host_port == "127.0.0.1:3000" {
			return Err(Error::ForbiddenTarget("proxy cannot target itself".into()));
		}

		Ok(())
	}

	/// Whether this host is on the tracker denylist
	pub fn is_tracker(host: &str) -> bool {
		let host = host.to_ascii_lowercase();
		TRACKER_DOMAINS
			.iter()
			.any(|d| host == *d || host.ends_with(&format!(".{}", d)))
	}
}

/// True when a relative reference looks like a sub-resource load
fn looks_like_asset(reference: &str) -> bool {
	const ASSET_SEGMENTS: &[&str] =
		&["img/", "image/", "images/", "js/", "css/", "assets/", "static/", "media/", "fonts/", "textures/", "sounds/"];
	let path = reference.trim_start_matches('/');
	if ASSET_SEGMENTS.iter().any(|seg| path.contains(seg)) {
		return true;
	}
	!matches!(asset::classify_path(reference), asset::AssetClass::Document)
}

static PRIVATE_NETS: OnceLock<Vec<IpNet>> = OnceLock::new();

/// Private, loopback, link-local, and unspecified ranges, v4 and v6.
/// Real CIDR containment: 172.31.255.255 is caught, 172.32.0.1 is not.
fn private_nets() -> &'static [IpNet] {
	PRIVATE_NETS.get_or_init(|| {
		[
			"127.0.0.0/8",
			"10.0.0.0/8",
			"172.16.0.0/12",
			"192.168.0.0/16",
			"169.254.0.0/16",
			"100.64.0.0/10",
			"0.0.0.0/32",
			"::1/128",
			"::/128",
			"fe80::/10",
			"fc00::/7",
		]
		.iter()
		.filter_map(|net| net.parse().ok())
		.collect()
	})
}

fn is_private_ip(ip: IpAddr) -> bool {
	private_nets().iter().any(|net| net.contains(&ip))
}


// vim: ts=4
