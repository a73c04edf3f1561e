use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use framegate_core::rate_limit::IpLimitLayer;

use crate::app::{App, VERSION};
use crate::proxy::{handler, PROXY_ROUTE};

#[derive(Serialize)]
struct Health {
	name: &'static str,
	version: &'static str,
}

async fn healthz() -> Json<Health> {
	Json(Health { name: "framegate", version: VERSION })
}

pub fn init(state: App) -> Router {
	let ip_limit = IpLimitLayer::new(state.limiter.clone(), state.opts.mode);

	let proxy_router = Router::new()
		.route(
			PROXY_ROUTE,
			get(handler::proxy_get)
				.post(handler::proxy_post)
				.head(handler::proxy_head)
				.options(handler::proxy_options),
		)
		.layer(ip_limit);

	Router::new()
		.merge(proxy_router)
		.route("/healthz", get(healthz))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

// vim: ts=4
