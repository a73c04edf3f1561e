//! Router-level tests for the proxy gate: everything that rejects or
//! short-circuits before any upstream traffic would happen.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use framegate::{app::AppState, config::Config, routes};

fn router() -> axum::Router {
	let state = AppState::new(Config::default()).unwrap();
	routes::init(state)
}

async fn get(router: &axum::Router, uri: &str) -> axum::response::Response {
	router
		.clone()
		.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
		.await
		.unwrap()
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
	let router = router();
	let resp = get(&router, "/api/proxy/web").await;
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

	let resp = get(&router, "/api/proxy/web?url=").await;
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forbidden_targets() {
	let router = router();
	for uri in [
		"/api/proxy/web?url=ftp%3A%2F%2Fexample.com%2Ff",
		"/api/proxy/web?url=http%3A%2F%2F127.0.0.1%2Fadmin",
		"/api/proxy/web?url=http%3A%2F%2F10.0.0.5%2F",
		"/api/proxy/web?url=http%3A%2F%2F169.254.169.254%2Flatest%2Fmeta-data%2F",
		"/api/proxy/web?url=https%3A%2F%2Fframegate.app%2Fapi%2Fproxy%2Fweb",
	] {
		let resp = get(&router, uri).await;
		assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} should be forbidden", uri);
	}
}

#[tokio::test]
async fn test_url_budget_exhaustion_returns_429() {
	let router = router();
	// A gated target exercises the URL budget without upstream traffic:
	// the limiter runs before the safety gate rejects
	let uri = "/api/proxy/web?url=http%3A%2F%2Flocalhost%2Fburst";

	for n in 1..=10 {
		let resp = get(&router, uri).await;
		assert_eq!(resp.status(), StatusCode::FORBIDDEN, "request {} hits the gate", n);
	}

	let resp = get(&router, uri).await;
	assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
	assert_eq!(resp.headers().get("Retry-After").unwrap(), "60");
	assert_eq!(resp.headers().get("X-RateLimit-Limit").unwrap(), "10");
	assert_eq!(resp.headers().get("X-RateLimit-Remaining").unwrap(), "0");
	assert!(resp.headers().contains_key("X-RateLimit-Reset"));

	let body = resp.into_body().collect().await.unwrap().to_bytes();
	let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(envelope["error"]["code"], "E-RATE-LIMITED");
	assert_eq!(envelope["error"]["details"]["scope"], "url");
}

#[tokio::test]
async fn test_distinct_urls_have_distinct_budgets() {
	let router = router();
	for n in 0..10 {
		let uri = format!("/api/proxy/web?url=http%3A%2F%2Flocalhost%2Fpage{}", n);
		let resp = get(&router, &uri).await;
		// Never 429: each URL gets its own window
		assert_eq!(resp.status(), StatusCode::FORBIDDEN);
	}
}

#[tokio::test]
async fn test_tracker_script_served_as_stub() {
	let router = router();
	let resp =
		get(&router, "/api/proxy/web?url=https%3A%2F%2Fwww.google-analytics.com%2Fanalytics.js")
			.await;
	assert_eq!(resp.status(), StatusCode::OK);
	assert!(resp
		.headers()
		.get(header::CONTENT_TYPE)
		.unwrap()
		.to_str()
		.unwrap()
		.contains("javascript"));
	let body = resp.into_body().collect().await.unwrap().to_bytes();
	assert!(body.is_empty());
}

#[tokio::test]
async fn test_tracker_pixel_served_as_no_content() {
	let router = router();
	let resp = get(&router, "/api/proxy/web?url=https%3A%2F%2Fcdn.mixpanel.com%2Fpixel.gif").await;
	assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_options_preflight() {
	let router = router();
	let resp = router
		.clone()
		.oneshot(
			Request::builder()
				.method("OPTIONS")
				.uri("/api/proxy/web")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(resp.status(), StatusCode::NO_CONTENT);
	let methods = resp
		.headers()
		.get(header::ACCESS_CONTROL_ALLOW_METHODS)
		.unwrap()
		.to_str()
		.unwrap();
	for method in ["GET", "POST", "PUT", "DELETE", "OPTIONS", "HEAD"] {
		assert!(methods.contains(method), "preflight must allow {}", method);
	}
	assert_eq!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
}

#[tokio::test]
async fn test_head_validates_without_fetching() {
	let router = router();
	let query = serde_urlencoded::to_string([("url", "https://example.com/")]).unwrap();
	let resp = router
		.clone()
		.oneshot(
			Request::builder()
				.method("HEAD")
				.uri(format!("/api/proxy/web?{}", query))
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(resp.status(), StatusCode::OK);

	let resp = router
		.clone()
		.oneshot(
			Request::builder()
				.method("HEAD")
				.uri("/api/proxy/web?url=http%3A%2F%2Flocalhost%2F")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_healthz() {
	let router = router();
	let resp = get(&router, "/healthz").await;
	assert_eq!(resp.status(), StatusCode::OK);
	let body = resp.into_body().collect().await.unwrap().to_bytes();
	let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(health["name"], "framegate");
}

// vim: ts=4
