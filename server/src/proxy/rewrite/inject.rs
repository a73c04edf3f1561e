//! Script runtime injection
//!
//! Every proxied HTML document gets a runtime injected before `</head>`
//! that keeps dynamic requests inside the proxy: fetch/XHR/WebSocket
//! URL rewriting, neutralized escape hatches (window.open, location
//! mutation), and document-level form and anchor interception.

use url::Url;

use super::find_ci;
use crate::proxy::PROXY_ROUTE;

const RUNTIME_MARKER: &str = "framegate-runtime";

const RUNTIME_TEMPLATE: &str = r##"<script id="framegate-runtime">
(function() {
	if (window.__fgRuntime) return;
	window.__fgRuntime = true;
	var ORIGIN = "__ORIGIN__";
	var PREFIX = "__PREFIX__";

	function skip(u) {
		if (!u || typeof u !== "string") return true;
		var l = u.toLowerCase();
		if (u.charAt(0) === "#") return true;
		if (l.indexOf("javascript:") === 0 || l.indexOf("data:") === 0 ||
			l.indexOf("blob:") === 0 || l.indexOf("file:") === 0 ||
			l.indexOf("ftp:") === 0 || l.indexOf("mailto:") === 0 ||
			l.indexOf("tel:") === 0 || l.indexOf("about:") === 0) return true;
		if (u.indexOf(PREFIX) !== -1) return true;
		if (l.indexOf("__ROUTE__") === 0) return true;
		return false;
	}

	function absolute(u) {
		if (/^https?:\/\//i.test(u)) return u;
		if (u.indexOf("//") === 0) return "https:" + u;
		if (u.charAt(0) === "/") return ORIGIN + u;
		try { return new URL(u, ORIGIN + location.pathname).href; }
		catch (e) { return ORIGIN + "/" + u; }
	}

	function toProxy(u) {
		if (skip(u)) return u;
		return PREFIX + encodeURIComponent(absolute(u));
	}

	// Dynamic requests
	var origFetch = window.fetch;
	window.fetch = function(input, init) {
		try {
			if (typeof input === "string") input = toProxy(input);
			else if (input && input.url) input = new Request(toProxy(input.url), input);
		} catch (e) {}
		return origFetch.call(this, input, init);
	};

	var origOpen = XMLHttpRequest.prototype.open;
	XMLHttpRequest.prototype.open = function(method, url) {
		var args = Array.prototype.slice.call(arguments);
		try { args[1] = toProxy(url); } catch (e) {}
		return origOpen.apply(this, args);
	};

	var OrigWebSocket = window.WebSocket;
	window.WebSocket = function(url, protocols) {
		try {
			if (typeof url === "string") {
				if (url.indexOf("//") === 0) url = "wss:" + url;
				else if (url.charAt(0) === "/") url = ORIGIN.replace(/^http/, "ws") + url;
				if (url.indexOf("ws://") === 0) url = "wss://" + url.slice(5);
			}
		} catch (e) {}
		return protocols === undefined
			? new OrigWebSocket(url)
			: new OrigWebSocket(url, protocols);
	};
	window.WebSocket.prototype = OrigWebSocket.prototype;

	// Escape hatches: the framed page must not navigate the parent
	var nav = window.location.assign.bind(window.location);
	window.open = function() { return null; };
	try { window.location.assign = function() {}; } catch (e) {}
	try { window.location.replace = function() {}; } catch (e) {}
	try { window.location.reload = function() {}; } catch (e) {}
	try {
		Object.defineProperty(window.location, "href", {
			get: function() { return document.URL; },
			set: function() {}
		});
	} catch (e) {}

	// Navigation stays inside the proxy
	document.addEventListener("submit", function(e) {
		var form = e.target;
		if (!form || !form.getAttribute) return;
		var action = form.getAttribute("action") || "";
		if (skip(action)) return;
		e.preventDefault();
		form.setAttribute("action", toProxy(action));
		form.submit();
	}, true);

	document.addEventListener("click", function(e) {
		var el = e.target;
		while (el && el.tagName !== "A") el = el.parentElement;
		if (!el) return;
		var href = el.getAttribute("href") || "";
		if (skip(href)) return;
		e.preventDefault();
		nav(toProxy(href));
	}, true);
})();
</script>"##;

/// Build the runtime for a page and insert it before `</head>`, or
/// prepend it when the document has no head
pub fn inject_runtime(html: &str, page: &Url) -> String {
	if html.contains(RUNTIME_MARKER) {
		return html.to_string();
	}

	let origin = format!("{}://{}", page.scheme(), page.host_str().unwrap_or_default());
	let script = RUNTIME_TEMPLATE
		.replace("__ORIGIN__", &origin)
		.replace("__PREFIX__", &format!("{}?url=", PROXY_ROUTE))
		.replace("__ROUTE__", PROXY_ROUTE);

	match find_ci(html, "</head>", 0) {
		Some(pos) => {
			let mut out = String::with_capacity(html.len() + script.len());
			out.push_str(&html[..pos]);
			out.push_str(&script);
			out.push_str(&html[pos..]);
			out
		}
		None => format!("{}{}", script, html),
	}
}


// vim: ts=4
