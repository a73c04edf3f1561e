//! HTML rewriting
//!
//! Quote-aware string rewriting of URL-bearing attributes so every
//! sub-resource and navigation flows back through the proxy. Anchors,
//! non-network schemes, and already-proxied values are left alone, which
//! also makes a second pass over rewritten markup a no-op.

use url::Url;

use super::{find_ci, proxy_url};
use crate::proxy::PROXY_ROUTE;

const REWRITTEN_ATTRS: &[&str] = &["src", "href", "action"];

const SKIP_SCHEMES: &[&str] = &[
	"javascript:",
	"data:",
	"blob:",
	"mailto:",
	"tel:",
	"file:",
	"ftp:",
	"about:",
];

pub fn rewrite_html(html: &str, page: &Url) -> String {
	let mut out = html.to_string();
	for attr in REWRITTEN_ATTRS {
		for quote in ['"', '\''] {
			out = rewrite_attr(&out, attr, quote, &|value| rewrite_url_value(value, page));
		}
	}
	for quote in ['"', '\''] {
		out = rewrite_attr(&out, "srcset", quote, &|value| rewrite_srcset_value(value, page));
	}
	rewrite_meta_refresh(&out, page)
}

/// Rewrite one attribute's value everywhere it appears. The transform
/// returns `None` to leave a value untouched.
fn rewrite_attr(
	html: &str,
	attr: &str,
	quote: char,
	transform: &dyn Fn(&str) -> Option<String>,
) -> String {
	let pattern = format!("{}={}", attr, quote);
	let mut out = String::with_capacity(html.len() + html.len() / 8);
	let mut pos = 0;

	while let Some(found) = find_ci(html, &pattern, pos) {
		let value_start = found + pattern.len();
		let Some(close) = html[value_start..].find(quote) else {
			break;
		};
		let value_end = value_start + close;

		out.push_str(&html[pos..value_start]);

		// `src=` must not match inside `data-src=`; require a
		// non-identifier character before the attribute name
		let boundary_ok = found == 0
			|| !matches!(html.as_bytes()[found - 1], b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_');

		let value = &html[value_start..value_end];
		match transform(value) {
			Some(rewritten) if boundary_ok => out.push_str(&rewritten),
			_ => out.push_str(value),
		}

		out.push(quote);
		pos = value_end + quote.len_utf8();
	}
	out.push_str(&html[pos..]);
	out
}

/// Resolve one attribute value and point it at the proxy.
/// `None` = leave untouched.
pub fn rewrite_url_value(value: &str, page: &Url) -> Option<String> {
	let trimmed = value.trim();
	if trimmed.is_empty() || trimmed.starts_with('#') {
		return None;
	}
	let lower = trimmed.to_ascii_lowercase();
	if SKIP_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
		return None;
	}
	// Idempotence: a value already pointing at the proxy stays as-is
	if trimmed.starts_with(PROXY_ROUTE) || trimmed.contains("/api/proxy/web?url=") {
		return None;
	}

	if lower.starts_with("http://") || lower.starts_with("https://") {
		return Some(proxy_url(trimmed));
	}
	if let Some(rest) = trimmed.strip_prefix("//") {
		return Some(proxy_url(&format!("https://{}", rest)));
	}
	if trimmed.starts_with('/') {
		let origin = format!("{}://{}", page.scheme(), page.host_str().unwrap_or_default());
		return Some(proxy_url(&format!("{}{}", origin, trimmed)));
	}
	page.join(trimmed).ok().map(|absolute| proxy_url(absolute.as_str()))
}

/// `srcset` carries comma-separated "url descriptor" entries; rewrite
/// each URL and keep the descriptors
fn rewrite_srcset_value(value: &str, page: &Url) -> Option<String> {
	let mut changed = false;
	let rewritten: Vec<String> = value
		.split(',')
		.map(|entry| {
			let entry = entry.trim();
			let (candidate, descriptor) = match entry.split_once(char::is_whitespace) {
				Some((url, rest)) => (url, Some(rest.trim())),
				None => (entry, None),
			};
			match rewrite_url_value(candidate, page) {
				Some(proxied) => {
					changed = true;
					match descriptor {
						Some(d) => format!("{} {}", proxied, d),
						None => proxied,
					}
				}
				None => entry.to_string(),
			}
		})
		.collect();

	if changed {
		Some(rewritten.join(", "))
	} else {
		None
	}
}

/// Rewrite the URL inside `<meta http-equiv="refresh" content="N;url=...">`
fn rewrite_meta_refresh(html: &str, page: &Url) -> String {
	let mut out = String::with_capacity(html.len());
	let mut pos = 0;

	while let Some(found) = find_ci(html, "<meta", pos) {
		let Some(tag_close) = html[found..].find('>') else {
			break;
		};
		let tag_end = found + tag_close + 1;
		let tag = &html[found..tag_end];

		out.push_str(&html[pos..found]);

		if find_ci(tag, "http-equiv", 0).is_some() && find_ci(tag, "refresh", 0).is_some() {
			out.push_str(&rewrite_refresh_tag(tag, page));
		} else {
			out.push_str(tag);
		}
		pos = tag_end;
	}
	out.push_str(&html[pos..]);
	out
}

fn rewrite_refresh_tag(tag: &str, page: &Url) -> String {
	for quote in ['"', '\''] {
		let pattern = format!("content={}", quote);
		let Some(found) = find_ci(tag, &pattern, 0) else { continue };
		let value_start = found + pattern.len();
		let Some(close) = tag[value_start..].find(quote) else { continue };
		let value_end = value_start + close;
		let value = &tag[value_start..value_end];

		// content value looks like "5;url=/next" (url= part optional)
		let Some(url_pos) = find_ci(value, "url=", 0) else { continue };
		let target = value[url_pos + 4..].trim();
		if let Some(proxied) = rewrite_url_value(target, page) {
			let new_value = format!("{}url={}", &value[..url_pos], proxied);
			return format!("{}{}{}", &tag[..value_start], new_value, &tag[value_end..]);
		}
	}
	tag.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn page() -> Url {
		Url::parse("https://example.com/page").unwrap()
	}

	#[test]
	fn test_root_relative_src_round_trip() {
		let html = r#"<img src="/img/a.png">"#;
		let out = rewrite_html(html, &page());
		assert_eq!(
			out,
			r#"<img src="/api/proxy/web?url=https%3A%2F%2Fexample.com%2Fimg%2Fa.png">"#
		);

		// Decoding the query parameter reproduces the original exactly
		let encoded = out
			.split("url=")
			.nth(1)
			.unwrap()
			.trim_end_matches("\">");
		assert_eq!(
			urlencoding::decode(encoded).unwrap(),
			"https://example.com/img/a.png"
		);
	}

	#[test]
	fn test_absolute_href_rewritten() {
		let html = r#"<a href="https://other.example.net/p">link</a>"#;
		let out = rewrite_html(html, &page());
		assert!(out.contains("/api/proxy/web?url=https%3A%2F%2Fother.example.net%2Fp"));
	}

	#[test]
	fn test_relative_resolves_against_page_path() {
		let page = Url::parse("https://example.com/dir/page.html").unwrap();
		let out = rewrite_html(r#"<img src="pic.jpg">"#, &page);
		assert!(out.contains("url=https%3A%2F%2Fexample.com%2Fdir%2Fpic.jpg"));
	}

	#[test]
	fn test_second_pass_is_noop() {
		let html = r#"<img src="/img/a.png"><a href="https://b.example.com/">x</a>"#;
		let once = rewrite_html(html, &page());
		let twice = rewrite_html(&once, &page());
		assert_eq!(once, twice);
	}

	#[test]
	fn test_anchors_and_schemes_skipped() {
		let html = concat!(
			r##"<a href="#section">s</a>"##,
			r#"<a href="mailto:a@example.com">m</a>"#,
			r#"<a href="tel:+1555">t</a>"#,
			r#"<a href="javascript:void(0)">j</a>"#,
			r#"<img src="data:image/png;base64,AAAA">"#,
		);
		assert_eq!(rewrite_html(html, &page()), html);
	}

	#[test]
	fn test_data_src_not_confused_with_src() {
		let html = r#"<img data-src="/lazy.png" src="/eager.png">"#;
		let out = rewrite_html(html, &page());
		assert!(out.contains(r#"data-src="/lazy.png""#));
		assert!(out.contains("src=\"/api/proxy/web?url=https%3A%2F%2Fexample.com%2Feager.png\""));
	}

	#[test]
	fn test_form_action_rewritten() {
		let html = r#"<form action="/search" method="get">"#;
		let out = rewrite_html(html, &page());
		assert!(out.contains("action=\"/api/proxy/web?url=https%3A%2F%2Fexample.com%2Fsearch\""));
	}

	#[test]
	fn test_srcset_rewrites_each_candidate() {
		let html = r#"<img srcset="/a.png 1x, https://cdn.example.net/b.png 2x">"#;
		let out = rewrite_html(html, &page());
		assert!(out.contains("url=https%3A%2F%2Fexample.com%2Fa.png 1x"));
		assert!(out.contains("url=https%3A%2F%2Fcdn.example.net%2Fb.png 2x"));
	}

	#[test]
	fn test_meta_refresh_rewritten() {
		let html = r#"<meta http-equiv="refresh" content="3;url=/next">"#;
		let out = rewrite_html(html, &page());
		assert!(out.contains("content=\"3;url=/api/proxy/web?url=https%3A%2F%2Fexample.com%2Fnext\""));
	}

	#[test]
	fn test_protocol_relative_upgraded() {
		let out = rewrite_html(r#"<script src="//cdn.example.net/l.js"></script>"#, &page());
		assert!(out.contains("url=https%3A%2F%2Fcdn.example.net%2Fl.js"));
	}
}

// vim: ts=4
