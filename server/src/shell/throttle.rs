//! Courtesy throttle
//!
//! Client-side navigation pacing, separate from the server-side limiter:
//! at most one navigation per second and twenty per rolling minute. This
//! keeps an impatient user from burning their own server-side budget.

use std::collections::VecDeque;
use std::time::Duration;

// tokio's Instant, not std's, so paced navigation follows the runtime
// clock (and its test-time control)
use tokio::time::Instant;

#[derive(Debug)]
pub struct CourtesyThrottle {
	min_gap: Duration,
	window: Duration,
	max_per_window: u32,
	last: Option<Instant>,
	recent: VecDeque<Instant>,
}

impl CourtesyThrottle {
	pub fn new(min_gap: Duration, window: Duration, max_per_window: u32) -> Self {
		Self { min_gap, window, max_per_window, last: None, recent: VecDeque::new() }
	}

	/// Record a navigation attempt; false means it should be dropped
	pub fn allow(&mut self) -> bool {
		self.allow_at(Instant::now())
	}

	pub fn allow_at(&mut self, now: Instant) -> bool {
		while let Some(&front) = self.recent.front() {
			if now.duration_since(front) > self.window {
				self.recent.pop_front();
			} else {
				break;
			}
		}

		if let Some(last) = self.last {
			if now.duration_since(last) < self.min_gap {
				return false;
			}
		}
		if self.recent.len() as u32 >= self.max_per_window {
			return false;
		}

		self.last = Some(now);
		self.recent.push_back(now);
		true
	}
}

impl Default for CourtesyThrottle {
	fn default() -> Self {
		Self::new(Duration::from_secs(1), Duration::from_secs(60), 20)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_min_gap_enforced() {
		let mut t = CourtesyThrottle::default();
		let now = Instant::now();

		assert!(t.allow_at(now));
		assert!(!t.allow_at(now + Duration::from_millis(500)));
		assert!(t.allow_at(now + Duration::from_millis(1100)));
	}

	#[test]
	fn test_rolling_window_cap() {
		let mut t = CourtesyThrottle::default();
		let start = Instant::now();

		for i in 0..20 {
			assert!(t.allow_at(start + Duration::from_secs(i * 2)), "navigation {} allowed", i);
		}
		// 20 in the window: the next is dropped even with the gap honored
		assert!(!t.allow_at(start + Duration::from_secs(41)));

		// Early entries age out of the rolling minute
		assert!(t.allow_at(start + Duration::from_secs(62)));
	}
}

// vim: ts=4
