//! Service configuration
//!
//! Everything comes from the environment; defaults suit a local
//! single-instance deployment behind the platform edge.

use std::env;
use std::time::Duration;

use framegate_core::extract::ServerMode;
use framegate_core::rate_limit::ProxyLimitConfig;

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
	/// Address the HTTP listener binds to
	pub listen: Box<str>,
	/// Public domains this service is reachable on; targets matching
	/// these are rejected to prevent recursive self-proxying
	pub own_domains: Box<[Box<str>]>,
	/// Whether forwarding headers from the platform edge are trusted
	pub mode: ServerMode,
	/// Upstream fetch deadline for ordinary hosts
	pub fetch_timeout: Duration,
	/// Upstream fetch deadline for game-heuristic hosts
	pub game_fetch_timeout: Duration,
	/// Deadline for the font mirror fallback fetch
	pub font_fallback_timeout: Duration,
	/// Budgets and thresholds for the limiter and domain guard
	pub limits: ProxyLimitConfig,
}

impl Config {
	pub fn from_env() -> FgResult<Self> {
		let listen = env::var("FRAMEGATE_LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".into());

		let own_domains: Box<[Box<str>]> = env::var("FRAMEGATE_DOMAINS")
			.unwrap_or_else(|_| "framegate.app".into())
			.split(',')
			.map(|d| d.trim())
			.filter(|d| !d.is_empty())
			.map(Box::from)
			.collect();
		if own_domains.is_empty() {
			return Err(Error::ConfigError("FRAMEGATE_DOMAINS must name at least one domain".into()));
		}

		let mode = match env::var("FRAMEGATE_TRUST_PROXY").as_deref() {
			Ok("1") | Ok("true") => ServerMode::Proxy,
			_ => ServerMode::Standalone,
		};

		Ok(Self {
			listen: listen.into(),
			own_domains,
			mode,
			fetch_timeout: Duration::from_secs(30),
			game_fetch_timeout: Duration::from_secs(45),
			font_fallback_timeout: Duration::from_secs(10),
			limits: ProxyLimitConfig::default(),
		})
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			listen: "0.0.0.0:8080".into(),
			own_domains: Box::new(["framegate.app".into()]),
			mode: ServerMode::Standalone,
			fetch_timeout: Duration::from_secs(30),
			game_fetch_timeout: Duration::from_secs(45),
			font_fallback_timeout: Duration::from_secs(10),
			limits: ProxyLimitConfig::default(),
		}
	}
}

// vim: ts=4
