//! Domain Abuse Detector
//!
//! Per-hostname window counters with an escalating violation/block
//! policy. A domain crossing the spam threshold is soft-throttled first;
//! repeated breaches, or a single extreme burst, earn a timed hard block.
//! This protects the proxy from runaway game/ad-asset domains issuing
//! dozens of polling requests per second while tolerating normal
//! browsing bursts.

use std::num::NonZeroUsize;
use std::time::Instant;

use lru::LruCache;
use parking_lot::RwLock;

use super::config::ProxyLimitConfig;
use super::error::LimitError;
use crate::prelude::*;

/// Requests seen from one domain in the current window
#[derive(Debug, Clone, Copy)]
struct DomainCounter {
	count: u32,
	reset_at: Instant,
	/// Carried across window resets until the domain is unblocked
	violations: u32,
}

/// An active block on a domain
#[derive(Debug, Clone)]
struct DomainBlock {
	blocked_until: Instant,
	reason: Box<str>,
}

pub struct DomainGuard {
	counters: RwLock<LruCache<Box<str>, DomainCounter>>,
	blocks: RwLock<LruCache<Box<str>, DomainBlock>>,
	config: ProxyLimitConfig,
}

impl DomainGuard {
	pub fn new(config: ProxyLimitConfig) -> Self {
		// SAFETY: 1024 is non-zero
		const FALLBACK_CAP: NonZeroUsize = match NonZeroUsize::new(1024) {
			Some(v) => v,
			None => unreachable!(),
		};
		let cap = NonZeroUsize::new(config.max_tracked_domains).unwrap_or(FALLBACK_CAP);
		Self {
			counters: RwLock::new(LruCache::new(cap)),
			blocks: RwLock::new(LruCache::new(cap)),
			config,
		}
	}

	/// Check whether a request for `domain` may proceed
	pub fn check(&self, domain: &str) -> Result<(), LimitError> {
		self.check_at(domain, Instant::now())
	}

	pub fn check_at(&self, domain: &str, now: Instant) -> Result<(), LimitError> {
		// An active block short-circuits everything else
		{
			let mut blocks = self.blocks.write();
			if let Some(block) = blocks.get(domain) {
				if now < block.blocked_until {
					return Err(LimitError::DomainBlocked {
						domain: domain.into(),
						reason: block.reason.clone(),
						remaining_secs: (block.blocked_until - now).as_secs().max(1),
					});
				}
				// Block lapsed: unblock, and with it forgive past violations
				blocks.pop(domain);
				self.counters.write().pop(domain);
				debug!("Domain {} unblocked", domain);
			}
		}

		let mut counters = self.counters.write();
		if !counters.contains(domain) {
			counters.put(
				domain.into(),
				DomainCounter { count: 1, reset_at: now + self.config.window, violations: 0 },
			);
			return Ok(());
		}
		let Some(entry) = counters.get_mut(domain) else {
			return Ok(());
		};

		if now > entry.reset_at {
			// New window; violations carry forward
			entry.count = 1;
			entry.reset_at = now + self.config.window;
			return Ok(());
		}

		entry.count += 1;
		let count = entry.count;

		if count >= self.config.aggressive_threshold {
			drop(counters);
			self.block(domain, now, "aggressive spam");
			return Err(LimitError::DomainBlocked {
				domain: domain.into(),
				reason: "aggressive spam".into(),
				remaining_secs: self.config.block_duration.as_secs(),
			});
		}

		if count >= self.config.spam_threshold {
			entry.violations += 1;
			let violations = entry.violations;
			if violations >= self.config.violation_limit {
				drop(counters);
				self.block(domain, now, "multiple spam violations");
				return Err(LimitError::DomainBlocked {
					domain: domain.into(),
					reason: "multiple spam violations".into(),
					remaining_secs: self.config.block_duration.as_secs(),
				});
			}
			// Soft throttle: deny this request but do not block the domain yet
			return Err(LimitError::DomainThrottled { domain: domain.into() });
		}

		Ok(())
	}

	fn block(&self, domain: &str, now: Instant, reason: &str) {
		warn!("Blocking domain {} for {:?}: {}", domain, self.config.block_duration, reason);
		self.blocks.write().put(
			domain.into(),
			DomainBlock { blocked_until: now + self.config.block_duration, reason: reason.into() },
		);
	}

	/// Drop expired counters and lapsed blocks; returns how many were removed
	pub fn sweep(&self, now: Instant) -> usize {
		let mut removed = 0;

		let mut blocks = self.blocks.write();
		let lapsed: Vec<Box<str>> = blocks
			.iter()
			.filter(|(_, b)| now >= b.blocked_until)
			.map(|(d, _)| d.clone())
			.collect();
		for domain in lapsed {
			blocks.pop(&domain);
			removed += 1;
		}
		drop(blocks);

		let mut counters = self.counters.write();
		let expired: Vec<Box<str>> = counters
			.iter()
			.filter(|(_, c)| now > c.reset_at)
			.map(|(d, _)| d.clone())
			.collect();
		for domain in expired {
			counters.pop(&domain);
			removed += 1;
		}

		removed
	}

	/// Number of tracked counters plus active blocks (for stats/tests)
	pub fn tracked(&self) -> usize {
		self.counters.read().len() + self.blocks.read().len()
	}
}


// vim: ts=4
