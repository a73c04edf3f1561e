//! Browser session state machine
//!
//! Drives one embedded-browser tab: safety check, history, the load
//! countdown racing the frame's load event, bounded blind retries, and
//! the post-load rate-limit monitor. Many embedded sites (WebGL/canvas
//! game clients especially) never signal a load event through the
//! rewriting runtime; the countdown-and-retry loop compensates without
//! hanging forever.
//!
//! The UI owns the frame; everything network- or frame-facing goes
//! through [`ShellTransport`] so the machine is testable without one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::history::NavigationHistory;
use super::throttle::CourtesyThrottle;
use crate::prelude::*;
use crate::proxy::rewrite::proxy_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellState {
	Idle,
	CheckingSafety,
	Loading { retry: u32 },
	Loaded,
	RateLimited { reason: Box<str> },
	Failed { message: Box<str>, compat_warning: bool },
}

/// Outcome of a rate-limit probe against the proxy
#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
	pub rate_limited: bool,
	pub reason: Option<Box<str>>,
}

impl ProbeResult {
	/// Interpret a proxy response: 429s and domain-block markers mean
	/// the session must close the page
	pub fn from_response(status: axum::http::StatusCode, headers: &axum::http::HeaderMap) -> Self {
		if status == axum::http::StatusCode::TOO_MANY_REQUESTS {
			let reason = headers
				.get("X-Block-Reason")
				.and_then(|v| v.to_str().ok())
				.map(Box::from)
				.or_else(|| Some("Too many requests".into()));
			return Self { rate_limited: true, reason };
		}
		if let Some(domain) = headers.get("X-Blocked-Domain").and_then(|v| v.to_str().ok()) {
			return Self {
				rate_limited: true,
				reason: Some(format!("{} is temporarily blocked", domain).into()),
			};
		}
		Self::default()
	}
}

/// The session's view of the outside world: the reputation service, the
/// proxy endpoint, and the frame element
#[async_trait]
pub trait ShellTransport: Send + Sync + 'static {
	/// URL-reputation check consulted before navigation
	async fn check_safety(&self, url: &str) -> FgResult<bool>;

	/// Probe the proxied URL for rate-limit indicators
	async fn probe(&self, proxied_url: &str) -> FgResult<ProbeResult>;

	/// Point the frame at a proxied URL; `retry` distinguishes reloads
	async fn set_frame(&self, proxied_url: &str, retry: u32);

	/// Blank the frame
	async fn clear_frame(&self);
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
	/// How long to wait for the frame's load event before intervening
	pub countdown: Duration,
	/// Blind reloads after the countdown expires
	pub max_retries: u32,
	/// Cadence of the post-load rate-limit monitor
	pub monitor_interval: Duration,
	/// Courtesy throttle: minimum gap between navigations
	pub min_nav_gap: Duration,
	/// Courtesy throttle: navigations per rolling minute
	pub max_nav_per_minute: u32,
}

impl Default for ShellConfig {
	fn default() -> Self {
		Self {
			countdown: Duration::from_secs(2),
			max_retries: 2,
			monitor_interval: Duration::from_secs(5),
			min_nav_gap: Duration::from_secs(1),
			max_nav_per_minute: 20,
		}
	}
}

struct Inner {
	state: ShellState,
	history: NavigationHistory,
	throttle: CourtesyThrottle,
}

pub struct BrowserSession<T: ShellTransport> {
	transport: Arc<T>,
	config: ShellConfig,
	inner: Mutex<Inner>,
	frame_loaded: Notify,
	monitor: Mutex<Option<JoinHandle<()>>>,
}

impl<T: ShellTransport> BrowserSession<T> {
	pub fn new(transport: Arc<T>, config: ShellConfig) -> Arc<Self> {
		let throttle = CourtesyThrottle::new(
			config.min_nav_gap,
			Duration::from_secs(60),
			config.max_nav_per_minute,
		);
		Arc::new(Self {
			transport,
			config,
			inner: Mutex::new(Inner {
				state: ShellState::Idle,
				history: NavigationHistory::new(),
				throttle,
			}),
			frame_loaded: Notify::new(),
			monitor: Mutex::new(None),
		})
	}

	pub fn state(&self) -> ShellState {
		self.inner.lock().state.clone()
	}

	pub fn current_url(&self) -> Option<String> {
		self.inner.lock().history.current().map(str::to_string)
	}

	pub fn can_go_back(&self) -> bool {
		self.inner.lock().history.can_go_back()
	}

	pub fn can_go_forward(&self) -> bool {
		self.inner.lock().history.can_go_forward()
	}

	/// The frame's load event; the UI wires this to the iframe
	pub fn frame_loaded(&self) {
		self.frame_loaded.notify_one();
	}

	/// Navigate to a new URL: throttle, safety check, history push, load
	pub async fn navigate(self: &Arc<Self>, url: &str) -> FgResult<ShellState> {
		if !self.inner.lock().throttle.allow() {
			return Err(Error::ValidationError("navigating too quickly, slow down".into()));
		}

		self.stop_monitor();
		self.inner.lock().state = ShellState::CheckingSafety;

		if !self.transport.check_safety(url).await? {
			let state = ShellState::Failed {
				message: "This site failed the safety check".into(),
				compat_warning: false,
			};
			self.inner.lock().state = state.clone();
			return Ok(state);
		}

		self.inner.lock().history.push(url);
		Ok(self.load(url).await)
	}

	pub async fn back(self: &Arc<Self>) -> Option<ShellState> {
		let url = self.inner.lock().history.back().map(str::to_string)?;
		self.stop_monitor();
		Some(self.load(&url).await)
	}

	pub async fn forward(self: &Arc<Self>) -> Option<ShellState> {
		let url = self.inner.lock().history.forward().map(str::to_string)?;
		self.stop_monitor();
		Some(self.load(&url).await)
	}

	pub async fn refresh(self: &Arc<Self>) -> Option<ShellState> {
		let url = self.current_url()?;
		self.stop_monitor();
		Some(self.load(&url).await)
	}

	/// Close the page and return to the idle start screen
	pub async fn home(&self) {
		self.stop_monitor();
		self.transport.clear_frame().await;
		let mut inner = self.inner.lock();
		inner.history.clear();
		inner.state = ShellState::Idle;
	}

	/// The load sequence: set the frame, race the countdown against the
	/// load event, and retry blind up to the configured cap
	async fn load(self: &Arc<Self>, url: &str) -> ShellState {
		let proxied = proxy_url(url);

		for retry in 0..=self.config.max_retries {
			self.inner.lock().state = ShellState::Loading { retry };

			// Drop any load event left over from a previous page
			let _ = self.frame_loaded.notified().now_or_never();

			self.transport.set_frame(&proxied, retry).await;

			let loaded = tokio::select! {
				_ = self.frame_loaded.notified() => true,
				_ = tokio::time::sleep(self.config.countdown) => false,
			};

			if loaded {
				self.inner.lock().state = ShellState::Loaded;
				self.start_monitor(proxied.clone());
				return ShellState::Loaded;
			}

			// Countdown elapsed: before reloading blind, make sure the
			// silence is not the rate limiter talking
			match self.transport.probe(&proxied).await {
				Ok(probe) if probe.rate_limited => {
					return self.enter_rate_limited(probe.reason).await;
				}
				Ok(_) => {}
				Err(err) => {
					debug!("Rate-limit probe failed during load: {}", err);
				}
			}
			debug!("Load countdown expired for {} (attempt {})", url, retry + 1);
		}

		// Out of retries: the page may be fine and just never signalled;
		// leave it displayed but tell the user
		let state = ShellState::Failed {
			message: "This page may not be compatible with the embedded browser".into(),
			compat_warning: true,
		};
		self.inner.lock().state = state.clone();
		state
	}

	async fn enter_rate_limited(&self, reason: Option<Box<str>>) -> ShellState {
		self.transport.clear_frame().await;
		let state = ShellState::RateLimited {
			reason: reason.unwrap_or_else(|| "Too many requests".into()),
		};
		let mut inner = self.inner.lock();
		// Closing the page entirely prevents accidental re-triggering
		inner.history.clear();
		inner.state = state.clone();
		state
	}

	/// Keep probing while the page stays open; detection closes it
	fn start_monitor(self: &Arc<Self>, proxied: String) {
		self.stop_monitor();
		let session = Arc::downgrade(self);
		let interval = self.config.monitor_interval;

		*self.monitor.lock() = Some(tokio::spawn(async move {
			loop {
				tokio::time::sleep(interval).await;
				let Some(session) = session.upgrade() else { return };
				match session.transport.probe(&proxied).await {
					Ok(probe) if probe.rate_limited => {
						session.enter_rate_limited(probe.reason).await;
						return;
					}
					Ok(_) => {}
					Err(err) => debug!("Rate-limit monitor probe failed: {}", err),
				}
			}
		}));
	}

	fn stop_monitor(&self) {
		if let Some(handle) = self.monitor.lock().take() {
			handle.abort();
		}
	}

	/// Tear the session down, cancelling any background monitor
	pub fn close(&self) {
		self.stop_monitor();
	}
}

impl<T: ShellTransport> Drop for BrowserSession<T> {
	fn drop(&mut self) {
		self.stop_monitor();
	}
}


// vim: ts=4
