//! Forwarding web proxy
//!
//! The pipeline for one request: per-IP limit (middleware) → decode →
//! per-URL limit → resolve + safety gate → domain check → tracker
//! suppression → upstream fetch → transform, with the fallback engine
//! absorbing upstream failures that have a content-aware substitute.

pub mod asset;
pub mod fallback;
pub mod fetch;
pub mod handler;
pub mod resolve;
pub mod rewrite;

/// Route the proxy is mounted on; rewritten URLs point back here
pub const PROXY_ROUTE: &str = "/api/proxy/web";

/// Paths of the embedding browser UI. A relative sub-resource request
/// whose referrer is one of these pages carries no usable base origin,
/// so the origin-hint table takes over.
pub const SHELL_UI_PATHS: &[&str] = &["/tools/browser", "/browser"];

// vim: ts=4
