//! Rate Counter Store
//!
//! Storage abstraction for fixed-window counters. A single-instance
//! deployment uses [`MemoryRateStore`]; a horizontally scaled one would
//! implement [`RateStore`] over a shared cache (the `hit` operation maps
//! onto an atomic INCR-with-expiry) without touching limiter call sites.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Result of applying one request to a fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
	Allowed {
		/// Requests left in the current window after this one
		remaining: u32,
		/// Time until the window resets
		reset_in: Duration,
	},
	Limited {
		reset_in: Duration,
	},
}

impl WindowOutcome {
	pub fn is_allowed(&self) -> bool {
		matches!(self, WindowOutcome::Allowed { .. })
	}
}

/// A fixed-window counter entry
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
	count: u32,
	reset_at: Instant,
}

/// Fixed-window counter storage
pub trait RateStore: Send + Sync {
	/// Atomically apply one request to `key`'s window.
	///
	/// A missing or expired entry resets to count=1 and allows. At or
	/// above `max` the count is NOT incremented and the request is
	/// limited. Otherwise the count increments and the request is
	/// allowed.
	fn hit(&self, key: &str, window: Duration, max: u32, now: Instant) -> WindowOutcome;

	/// Drop expired entries; returns how many were removed
	fn sweep(&self, now: Instant) -> usize;

	/// Number of live entries (for stats/tests)
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// In-memory store for a single-instance deployment
pub struct MemoryRateStore {
	entries: RwLock<HashMap<Box<str>, WindowEntry>>,
}

impl MemoryRateStore {
	pub fn new() -> Self {
		Self { entries: RwLock::new(HashMap::new()) }
	}
}

impl Default for MemoryRateStore {
	fn default() -> Self {
		Self::new()
	}
}

impl RateStore for MemoryRateStore {
	fn hit(&self, key: &str, window: Duration, max: u32, now: Instant) -> WindowOutcome {
		// Single write lock covers the whole read-modify-write, so two
		// concurrent requests cannot both observe the pre-increment count
		let mut entries = self.entries.write();

		if let Some(entry) = entries.get_mut(key) {
			if now <= entry.reset_at {
				if entry.count >= max {
					return WindowOutcome::Limited { reset_in: entry.reset_at - now };
				}
				entry.count += 1;
				return WindowOutcome::Allowed {
					remaining: max.saturating_sub(entry.count),
					reset_in: entry.reset_at - now,
				};
			}
		}

		// Missing or expired: a fresh window starts with this request
		entries.insert(key.into(), WindowEntry { count: 1, reset_at: now + window });
		WindowOutcome::Allowed { remaining: max.saturating_sub(1), reset_in: window }
	}

	fn sweep(&self, now: Instant) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|_, entry| now <= entry.reset_at);
		before - entries.len()
	}

	fn len(&self) -> usize {
		self.entries.read().len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const WINDOW: Duration = Duration::from_secs(60);

	#[test]
	fn test_exact_budget_then_limited() {
		let store = MemoryRateStore::new();
		let now = Instant::now();

		for i in 0..10 {
			let outcome = store.hit("url:https://example.com/", WINDOW, 10, now);
			assert!(outcome.is_allowed(), "request {} should pass", i + 1);
		}
		let outcome = store.hit("url:https://example.com/", WINDOW, 10, now);
		assert!(matches!(outcome, WindowOutcome::Limited { .. }));
	}

	#[test]
	fn test_limited_does_not_increment() {
		let store = MemoryRateStore::new();
		let now = Instant::now();

		for _ in 0..3 {
			store.hit("k", WINDOW, 3, now);
		}
		// Hammering past the limit must not push the reset time or count
		for _ in 0..100 {
			assert!(!store.hit("k", WINDOW, 3, now).is_allowed());
		}
		// One tick past the window the counter starts fresh
		let later = now + WINDOW + Duration::from_millis(1);
		assert!(store.hit("k", WINDOW, 3, later).is_allowed());
	}

	#[test]
	fn test_window_reset_restores_budget() {
		let store = MemoryRateStore::new();
		let now = Instant::now();

		for _ in 0..5 {
			store.hit("ip:203.0.113.9", WINDOW, 5, now);
		}
		assert!(!store.hit("ip:203.0.113.9", WINDOW, 5, now).is_allowed());

		let later = now + WINDOW + Duration::from_secs(1);
		let outcome = store.hit("ip:203.0.113.9", WINDOW, 5, later);
		assert!(matches!(outcome, WindowOutcome::Allowed { remaining: 4, .. }));
	}

	#[test]
	fn test_keys_are_independent() {
		let store = MemoryRateStore::new();
		let now = Instant::now();

		for _ in 0..10 {
			store.hit("ip:203.0.113.1", WINDOW, 10, now);
		}
		assert!(!store.hit("ip:203.0.113.1", WINDOW, 10, now).is_allowed());
		assert!(store.hit("ip:203.0.113.2", WINDOW, 10, now).is_allowed());
	}

	#[test]
	fn test_sweep_removes_only_expired() {
		let store = MemoryRateStore::new();
		let now = Instant::now();

		store.hit("old", WINDOW, 10, now);
		store.hit("new", WINDOW, 10, now + Duration::from_secs(30));
		assert_eq!(store.len(), 2);

		let removed = store.sweep(now + Duration::from_secs(61));
		assert_eq!(removed, 1);
		assert_eq!(store.len(), 1);
	}
}

// vim: ts=4
