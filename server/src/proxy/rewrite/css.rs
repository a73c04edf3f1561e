//! CSS rewriting
//!
//! Rewrites absolute and root-relative `url(...)` references into proxy
//! URLs. Same-directory relative references resolve correctly through
//! the proxied stylesheet URL itself and are left untouched.

use url::Url;

use super::{find_ci, proxy_url};

pub fn rewrite_css(css: &str, page: &Url) -> String {
	let origin = format!("{}://{}", page.scheme(), page.host_str().unwrap_or_default());
	let mut out = String::with_capacity(css.len() + css.len() / 8);
	let mut pos = 0;

	while let Some(found) = find_ci(css, "url(", pos) {
		let inner_start = found + 4;
		let Some(close) = css[inner_start..].find(')') else {
			break;
		};
		let inner_end = inner_start + close;

		out.push_str(&css[pos..inner_start]);

		let raw = css[inner_start..inner_end].trim();
		let (quote, value) = match raw.as_bytes().first() {
			Some(b'"') => ("\"", raw.trim_matches('"')),
			Some(b'\'') => ("'", raw.trim_matches('\'')),
			_ => ("", raw),
		};

		match rewrite_css_ref(value, &origin) {
			Some(rewritten) => {
				out.push_str(quote);
				out.push_str(&rewritten);
				out.push_str(quote);
			}
			None => out.push_str(raw),
		}

		out.push(')');
		pos = inner_end + 1;
	}
	out.push_str(&css[pos..]);
	out
}

/// Rewrite one `url()` reference; `None` leaves it untouched
fn rewrite_css_ref(value: &str, origin: &str) -> Option<String> {
	if value.is_empty() {
		return None;
	}
	let lower = value.to_ascii_lowercase();
	if lower.starts_with("data:") || lower.starts_with("blob:") {
		return None;
	}
	if value.starts_with(super::super::PROXY_ROUTE) {
		return None;
	}
	if lower.starts_with("http://") || lower.starts_with("https://") {
		return Some(proxy_url(value));
	}
	if let Some(rest) = value.strip_prefix("//") {
		return Some(proxy_url(&format!("https://{}", rest)));
	}
	if value.starts_with('/') {
		return Some(proxy_url(&format!("{}{}", origin, value)));
	}
	// Same-directory relative reference: resolves through the proxied
	// stylesheet URL, no rewrite needed
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	fn page() -> Url {
		Url::parse("https://example.com/styles/site.css").unwrap()
	}

	#[test]
	fn test_absolute_url_rewritten() {
		let css = "body { background: url(https://cdn.example.net/bg.png); }";
		let out = rewrite_css(css, &page());
		assert!(out.contains("/api/proxy/web?url=https%3A%2F%2Fcdn.example.net%2Fbg.png"));
	}

	#[test]
	fn test_root_relative_rewritten_with_origin() {
		let css = ".logo { background-image: url('/img/logo.svg'); }";
		let out = rewrite_css(css, &page());
		assert!(out.contains("url('/api/proxy/web?url=https%3A%2F%2Fexample.com%2Fimg%2Flogo.svg')"));
	}

	#[test]
	fn test_protocol_relative_upgraded() {
		let css = "@font-face { src: url(\"//fonts.example.net/a.woff2\"); }";
		let out = rewrite_css(css, &page());
		assert!(out.contains("url(\"/api/proxy/web?url=https%3A%2F%2Ffonts.example.net%2Fa.woff2\")"));
	}

	#[test]
	fn test_same_directory_reference_untouched() {
		let css = ".icon { background: url(sprites.png); } .a { background: url(../up.png); }";
		let out = rewrite_css(css, &page());
		assert_eq!(out, css);
	}

	#[test]
	fn test_data_uri_untouched() {
		let css = ".dot { background: url(data:image/png;base64,iVBOR=); }";
		assert_eq!(rewrite_css(css, &page()), css);
	}

	#[test]
	fn test_already_proxied_untouched() {
		let css = ".x { background: url(/api/proxy/web?url=https%3A%2F%2Fa.com%2Fb.png); }";
		assert_eq!(rewrite_css(css, &page()), css);
	}
}

// vim: ts=4
