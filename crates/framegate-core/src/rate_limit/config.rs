//! Rate Limiting Configuration
//!
//! Budgets for the fixed-window limiter and thresholds for the domain
//! abuse detector. All windows are 60 seconds unless noted.

use std::time::Duration;

/// Main rate limit configuration
#[derive(Clone, Debug)]
pub struct ProxyLimitConfig {
	/// Fixed window length for all counters
	pub window: Duration,
	/// Per-IP budget for GET requests
	pub ip_get_max: u32,
	/// Per-IP budget for POST requests
	pub ip_post_max: u32,
	/// Per-target-URL budget for GET requests
	pub url_get_max: u32,
	/// Per-target-URL budget for POST requests
	pub url_post_max: u32,

	/// Per-domain requests/window that counts as a spam violation
	pub spam_threshold: u32,
	/// Per-domain requests/window that triggers an immediate block
	pub aggressive_threshold: u32,
	/// Violations within one block cycle before a hard block
	pub violation_limit: u32,
	/// How long a blocked domain stays blocked
	pub block_duration: Duration,

	/// Cadence of the background sweep
	pub sweep_interval: Duration,
	/// Maximum number of domains to track (memory limit)
	pub max_tracked_domains: usize,
}

impl Default for ProxyLimitConfig {
	fn default() -> Self {
		Self {
			window: Duration::from_secs(60),
			ip_get_max: 100,
			ip_post_max: 50,
			url_get_max: 10,
			url_post_max: 5,
			spam_threshold: 50,
			aggressive_threshold: 100,
			violation_limit: 3,
			block_duration: Duration::from_secs(600),
			sweep_interval: Duration::from_secs(300),
			max_tracked_domains: 10_000,
		}
	}
}

impl ProxyLimitConfig {
	/// Per-IP budget for the given method
	pub fn ip_budget(&self, method: &hyper::Method) -> u32 {
		if method == hyper::Method::POST {
			self.ip_post_max
		} else {
			self.ip_get_max
		}
	}

	/// Per-URL budget for the given method
	pub fn url_budget(&self, method: &hyper::Method) -> u32 {
		if method == hyper::Method::POST {
			self.url_post_max
		} else {
			self.url_get_max
		}
	}
}

// vim: ts=4
