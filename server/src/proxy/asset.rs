//! Asset classification
//!
//! Content-type handling is extension-first: upstreams frequently
//! mislabel assets (a `.js` served as `text/plain` still has to execute),
//! so the URL path decides the class and the declared content-type only
//! fills the gaps.

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
	Document,
	Script,
	Style,
	Font,
	Image,
	Data,
	Binary,
}

const SCRIPT_EXT: &[&str] = &["js", "mjs"];
const STYLE_EXT: &[&str] = &["css"];
const FONT_EXT: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];
const IMAGE_EXT: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "avif", "bmp"];
const DATA_EXT: &[&str] = &["json"];
const BINARY_EXT: &[&str] = &["wasm", "mp3", "mp4", "ogg", "webm", "bin", "br", "map", "data"];

/// Lowercased extension of the final path segment, if any
pub fn path_extension(path: &str) -> Option<String> {
	let segment = path.rsplit('/').next()?;
	let (_, ext) = segment.rsplit_once('.')?;
	if ext.is_empty() || ext.len() > 5 {
		return None;
	}
	Some(ext.to_ascii_lowercase())
}

/// Classify a target by its path; no extension means a page load
pub fn classify(url: &Url) -> AssetClass {
	classify_path(url.path())
}

pub fn classify_path(path: &str) -> AssetClass {
	let Some(ext) = path_extension(path) else {
		return AssetClass::Document;
	};
	let ext = ext.as_str();
	if SCRIPT_EXT.contains(&ext) {
		AssetClass::Script
	} else if STYLE_EXT.contains(&ext) {
		AssetClass::Style
	} else if FONT_EXT.contains(&ext) {
		AssetClass::Font
	} else if IMAGE_EXT.contains(&ext) {
		AssetClass::Image
	} else if DATA_EXT.contains(&ext) {
		AssetClass::Data
	} else if BINARY_EXT.contains(&ext) {
		AssetClass::Binary
	} else if matches!(ext, "html" | "htm" | "xhtml" | "php" | "asp" | "aspx") {
		AssetClass::Document
	} else {
		AssetClass::Binary
	}
}

/// Content type implied by the extension, overriding upstream labels
pub fn content_type_for(url: &Url, upstream: Option<&str>) -> String {
	let forced = path_extension(url.path()).and_then(|ext| {
		Some(match ext.as_str() {
			"js" | "mjs" => "application/javascript; charset=utf-8",
			"css" => "text/css; charset=utf-8",
			"json" => "application/json; charset=utf-8",
			"svg" => "image/svg+xml",
			"png" => "image/png",
			"jpg" | "jpeg" => "image/jpeg",
			"gif" => "image/gif",
			"webp" => "image/webp",
			"ico" => "image/x-icon",
			"woff" => "font/woff",
			"woff2" => "font/woff2",
			"ttf" => "font/ttf",
			"otf" => "font/otf",
			"wasm" => "application/wasm",
			_ => return None,
		})
	});

	match forced {
		Some(ct) => ct.to_string(),
		None => upstream.unwrap_or("application/octet-stream").to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url(s: &str) -> Url {
		Url::parse(s).unwrap()
	}

	#[test]
	fn test_classify_by_extension() {
		assert_eq!(classify(&url("https://example.com/app.js")), AssetClass::Script);
		assert_eq!(classify(&url("https://example.com/site.css")), AssetClass::Style);
		assert_eq!(classify(&url("https://example.com/f/Lato.woff2")), AssetClass::Font);
		assert_eq!(classify(&url("https://example.com/a.png?v=2")), AssetClass::Image);
		assert_eq!(classify(&url("https://example.com/api/data.json")), AssetClass::Data);
		assert_eq!(classify(&url("https://example.com/game.wasm")), AssetClass::Binary);
	}

	#[test]
	fn test_pages_have_no_extension() {
		assert_eq!(classify(&url("https://example.com/")), AssetClass::Document);
		assert_eq!(classify(&url("https://example.com/about")), AssetClass::Document);
		assert_eq!(classify(&url("https://example.com/page.html")), AssetClass::Document);
		// A dotted host must not be mistaken for an extension
		assert_eq!(classify(&url("https://sub.example.io/play")), AssetClass::Document);
	}

	#[test]
	fn test_mislabel_override() {
		// Upstream says text/plain; the extension wins
		let ct = content_type_for(&url("https://example.com/app.js"), Some("text/plain"));
		assert_eq!(ct, "application/javascript; charset=utf-8");

		// No extension knowledge: upstream label passes through
		let ct = content_type_for(&url("https://example.com/feed"), Some("application/xml"));
		assert_eq!(ct, "application/xml");
	}
}

// vim: ts=4
