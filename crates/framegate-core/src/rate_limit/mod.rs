//! Rate Limiting
//!
//! Two cooperating subsystems guard the proxy:
//!
//! - a fixed-window limiter keyed by client IP and by target URL, bounding
//!   both "one client hammering everything" and "everyone hammering one
//!   URL" (a hot asset),
//! - a per-domain abuse detector with an escalating violation/block
//!   policy, protecting the proxy from runaway game/ad-asset domains.
//!
//! Counter state lives behind the [`store::RateStore`] abstraction so the
//! in-memory map can be swapped for a shared store in a multi-instance
//! deployment without touching call sites.

pub mod config;
pub mod domain;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod store;

pub use config::ProxyLimitConfig;
pub use domain::DomainGuard;
pub use error::LimitError;
pub use limiter::{LimitScope, RateLimiter, RateStatus};
pub use middleware::IpLimitLayer;
pub use store::{MemoryRateStore, RateStore, WindowOutcome};

// vim: ts=4
