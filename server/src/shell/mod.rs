//! Client browser shell
//!
//! The state machine behind the embedded-browser UI: navigation history,
//! a courtesy throttle, a load countdown racing the frame's load event
//! with bounded blind retries, and live rate-limit probing while a page
//! stays open. The UI drives it through [`session::BrowserSession`] and
//! supplies the network side via [`session::ShellTransport`].

pub mod history;
pub mod session;
pub mod throttle;

pub use history::NavigationHistory;
pub use session::{BrowserSession, ProbeResult, ShellConfig, ShellState, ShellTransport};
pub use throttle::CourtesyThrottle;

// vim: ts=4
