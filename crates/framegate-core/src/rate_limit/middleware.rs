//! Rate Limiting Middleware
//!
//! Tower layer applying the per-IP budget to proxy routes. The per-URL
//! and per-domain checks need the resolved target and run inside the
//! handler; the IP check needs only the connection, so it runs here and
//! rejects floods before any URL work happens.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use hyper::Request;
use tower::{Layer, Service};

use super::limiter::RateLimiter;
use crate::extract::{extract_client_ip, ServerMode};

/// Per-IP rate limit layer
#[derive(Clone)]
pub struct IpLimitLayer {
	limiter: Arc<RateLimiter>,
	mode: ServerMode,
}

impl IpLimitLayer {
	pub fn new(limiter: Arc<RateLimiter>, mode: ServerMode) -> Self {
		Self { limiter, mode }
	}
}

impl<S> Layer<S> for IpLimitLayer {
	type Service = IpLimitService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		IpLimitService { inner, limiter: self.limiter.clone(), mode: self.mode }
	}
}

/// Per-IP rate limit service
#[derive(Clone)]
pub struct IpLimitService<S> {
	inner: S,
	limiter: Arc<RateLimiter>,
	mode: ServerMode,
}

impl<S> Service<Request<Body>> for IpLimitService<S>
where
	S: Service<Request<Body>, Response = axum::response::Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let limiter = self.limiter.clone();
		let mode = self.mode;
		let mut inner = self.inner.clone();

		Box::pin(async move {
			// Preflight and HEAD validation don't count against budgets
			let method = req.method().clone();
			if method == hyper::Method::OPTIONS || method == hyper::Method::HEAD {
				return inner.call(req).await;
			}

			if let Some(ip) = extract_client_ip(&req, &mode) {
				if let Err(error) = limiter.check_ip(&ip, &method) {
					return Ok(error.into_response());
				}
			}

			inner.call(req).await
		})
	}
}

// vim: ts=4
