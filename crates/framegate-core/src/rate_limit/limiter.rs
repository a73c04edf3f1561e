//! Fixed-Window Rate Limiter
//!
//! Applies the per-IP and per-URL budgets from [`ProxyLimitConfig`] on
//! top of a [`RateStore`]. Denial is reported as a [`LimitError`] value
//! carrying everything the response headers need; no counter state leaks
//! to callers.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use super::config::ProxyLimitConfig;
use super::error::LimitError;
use super::store::{RateStore, WindowOutcome};

/// Which budget a check ran against, used in responses and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
	Ip,
	Url,
}

impl LimitScope {
	pub fn as_str(&self) -> &'static str {
		match self {
			LimitScope::Ip => "ip",
			LimitScope::Url => "url",
		}
	}
}

/// Snapshot returned on an allowed request, for X-RateLimit-* headers
#[derive(Debug, Clone, Copy)]
pub struct RateStatus {
	pub limit: u32,
	pub remaining: u32,
	pub reset_secs: u64,
}

pub struct RateLimiter {
	store: Arc<dyn RateStore>,
	config: ProxyLimitConfig,
}

impl RateLimiter {
	pub fn new(store: Arc<dyn RateStore>, config: ProxyLimitConfig) -> Self {
		Self { store, config }
	}

	pub fn config(&self) -> &ProxyLimitConfig {
		&self.config
	}

	pub fn store(&self) -> &Arc<dyn RateStore> {
		&self.store
	}

	/// Check the per-client budget for this method
	pub fn check_ip(&self, ip: &IpAddr, method: &hyper::Method) -> Result<RateStatus, LimitError> {
		self.check_scope(LimitScope::Ip, &format!("ip:{}", ip), self.config.ip_budget(method))
	}

	/// Check the per-resource budget for this method
	pub fn check_url(&self, url: &str, method: &hyper::Method) -> Result<RateStatus, LimitError> {
		self.check_scope(LimitScope::Url, &format!("url:{}", url), self.config.url_budget(method))
	}

	fn check_scope(
		&self,
		scope: LimitScope,
		key: &str,
		max: u32,
	) -> Result<RateStatus, LimitError> {
		self.check_scope_at(scope, key, max, Instant::now())
	}

	fn check_scope_at(
		&self,
		scope: LimitScope,
		key: &str,
		max: u32,
		now: Instant,
	) -> Result<RateStatus, LimitError> {
		match self.store.hit(key, self.config.window, max, now) {
			WindowOutcome::Allowed { remaining, reset_in } => {
				Ok(RateStatus { limit: max, remaining, reset_secs: reset_in.as_secs() })
			}
			WindowOutcome::Limited { reset_in } => Err(LimitError::RateLimited {
				scope,
				limit: max,
				reset_secs: reset_in.as_secs().max(1),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rate_limit::store::MemoryRateStore;
	use std::time::Duration;

	fn limiter() -> RateLimiter {
		RateLimiter::new(Arc::new(MemoryRateStore::new()), ProxyLimitConfig::default())
	}

	#[test]
	fn test_ip_budget_get_vs_post() {
		let limiter = limiter();
		let ip: IpAddr = "203.0.113.4".parse().unwrap();

		// POST budget is half the GET budget; both count against the
		// same key so exhaust POST first
		for _ in 0..50 {
			assert!(limiter.check_ip(&ip, &hyper::Method::POST).is_ok());
		}
		assert!(limiter.check_ip(&ip, &hyper::Method::POST).is_err());
		// GET budget for the same key still has headroom
		assert!(limiter.check_ip(&ip, &hyper::Method::GET).is_ok());
	}

	#[test]
	fn test_url_budget_exhausts_at_ten() {
		let limiter = limiter();

		for n in 1..=10 {
			let status = limiter.check_url("https://example.com/a.png", &hyper::Method::GET);
			assert!(status.is_ok(), "request {} should pass", n);
		}
		let err = limiter.check_url("https://example.com/a.png", &hyper::Method::GET);
		match err {
			Err(LimitError::RateLimited { scope, limit, .. }) => {
				assert_eq!(scope, LimitScope::Url);
				assert_eq!(limit, 10);
			}
			other => panic!("expected RateLimited, got {:?}", other.map(|_| ())),
		}
	}

	#[test]
	fn test_window_reset_allows_again() {
		let store = Arc::new(MemoryRateStore::new());
		let limiter = RateLimiter::new(store, ProxyLimitConfig::default());
		let now = Instant::now();

		for _ in 0..10 {
			assert!(limiter.check_scope_at(LimitScope::Url, "url:x", 10, now).is_ok());
		}
		assert!(limiter.check_scope_at(LimitScope::Url, "url:x", 10, now).is_err());

		let later = now + Duration::from_secs(61);
		assert!(limiter.check_scope_at(LimitScope::Url, "url:x", 10, later).is_ok());
	}

	#[test]
	fn test_remaining_counts_down() {
		let limiter = limiter();
		let ip: IpAddr = "203.0.113.5".parse().unwrap();

		let first = limiter.check_ip(&ip, &hyper::Method::GET).unwrap();
		assert_eq!(first.limit, 100);
		assert_eq!(first.remaining, 99);

		let second = limiter.check_ip(&ip, &hyper::Method::GET).unwrap();
		assert_eq!(second.remaining, 98);
	}
}

// vim: ts=4
