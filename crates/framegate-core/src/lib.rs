//! Core infrastructure for the Framegate proxy service.
//!
//! This crate contains the infrastructure shared by the server crate:
//! the fixed-window rate limiter and its store abstraction, the domain
//! abuse detector, the lifecycle-owned sweeper, and client address
//! extraction. Keeping these out of the server crate gives them a clear
//! boundary and lets them compile in parallel with the feature modules.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod error;
pub mod extract;
pub mod prelude;
pub mod rate_limit;
pub mod scheduler;

pub use error::{Error, FgResult};
pub use extract::{extract_client_ip, ServerMode};
pub use rate_limit::{DomainGuard, LimitError, ProxyLimitConfig, RateLimiter};
pub use scheduler::Sweeper;

// vim: ts=4
