//! App state type

use std::sync::Arc;

use framegate_core::rate_limit::{DomainGuard, MemoryRateStore, RateLimiter};
use framegate_core::scheduler::Sweeper;

use crate::config::Config;
use crate::prelude::*;
use crate::proxy::fetch::Fetcher;
use crate::proxy::resolve::UrlResolver;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
	pub opts: Config,
	pub limiter: Arc<RateLimiter>,
	pub domain_guard: Arc<DomainGuard>,
	pub resolver: UrlResolver,
	pub fetcher: Fetcher,
	pub sweeper: Sweeper,
}

pub type App = Arc<AppState>;

impl AppState {
	/// Wire up shared state and register the sweep tasks. The sweeper is
	/// not started here; the server starts it once the listener is up and
	/// stops it on drain.
	pub fn new(opts: Config) -> FgResult<App> {
		let store = Arc::new(MemoryRateStore::new());
		let limiter = Arc::new(RateLimiter::new(store.clone(), opts.limits.clone()));
		let domain_guard = Arc::new(DomainGuard::new(opts.limits.clone()));
		let resolver = UrlResolver::new(opts.own_domains.clone());
		let fetcher = Fetcher::new(&opts)?;

		let sweeper = Sweeper::new(opts.limits.sweep_interval);
		sweeper.register(store);
		sweeper.register(domain_guard.clone());

		Ok(Arc::new(Self { opts, limiter, domain_guard, resolver, fetcher, sweeper }))
	}
}

// vim: ts=4
