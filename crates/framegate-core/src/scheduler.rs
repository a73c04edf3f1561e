//! Sweeper scheduling
//!
//! The limiter and domain guard accumulate window entries that expire and
//! must be purged to bound memory growth. The [`Sweeper`] owns that
//! housekeeping as part of the service lifecycle: started once on init,
//! stopped on shutdown, so no free-running timer leaks across restarts
//! or test runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::prelude::*;
use crate::rate_limit::{DomainGuard, MemoryRateStore, RateStore};

/// A periodic cleanup job registered with the sweeper
pub trait SweepTask: Send + Sync {
	fn name(&self) -> &'static str;

	/// Remove expired state; returns how many entries were dropped
	fn sweep(&self, now: Instant) -> usize;
}

impl SweepTask for MemoryRateStore {
	fn name(&self) -> &'static str {
		"rate-windows"
	}

	fn sweep(&self, now: Instant) -> usize {
		RateStore::sweep(self, now)
	}
}

impl SweepTask for DomainGuard {
	fn name(&self) -> &'static str {
		"domain-guard"
	}

	fn sweep(&self, now: Instant) -> usize {
		DomainGuard::sweep(self, now)
	}
}

/// Lifecycle-owned periodic sweeper
pub struct Sweeper {
	interval: Duration,
	tasks: Mutex<Vec<Arc<dyn SweepTask>>>,
	shutdown_tx: watch::Sender<bool>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
	pub fn new(interval: Duration) -> Self {
		let (shutdown_tx, _) = watch::channel(false);
		Self { interval, tasks: Mutex::new(Vec::new()), shutdown_tx, handle: Mutex::new(None) }
	}

	/// Register a task. Must be called before [`Sweeper::start`].
	pub fn register(&self, task: Arc<dyn SweepTask>) {
		self.tasks.lock().push(task);
	}

	/// Spawn the sweep loop. Idempotent: a second call is a no-op.
	pub fn start(&self) {
		let mut handle = self.handle.lock();
		if handle.is_some() {
			return;
		}

		let tasks: Vec<Arc<dyn SweepTask>> = self.tasks.lock().clone();
		let interval = self.interval;
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		*handle = Some(tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			// The immediate first tick would sweep an empty store
			ticker.tick().await;

			loop {
				tokio::select! {
					_ = ticker.tick() => {
						let now = Instant::now();
						for task in &tasks {
							let removed = task.sweep(now);
							if removed > 0 {
								debug!("Sweep {}: removed {} expired entries", task.name(), removed);
							}
						}
					}
					_ = shutdown_rx.changed() => {
						debug!("Sweeper stopping");
						break;
					}
				}
			}
		}));
	}

	/// Signal the sweep loop to stop and wait for it to finish
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(true);
		let handle = self.handle.lock().take();
		if let Some(handle) = handle {
			if let Err(err) = handle.await {
				warn!("Sweeper task failed on shutdown: {}", err);
			}
		}
	}
}


// vim: ts=4
