//! Browser session management
//!
//! This module owns every live browser the harvester uses:
//! - `driver`: the `BrowserLauncher` / `BrowserDriver` seam over the browser engine
//! - `chromium`: the chromiumoxide-backed implementation
//! - `manager`: one session with liveness probing, relaunch and auth replay
//! - `pool`: a fixed set of sessions, one per concurrency slot
//!
//! A browser page is serially reentrant. Workers only ever reach a driver
//! through a leased [`SessionManager`], and only for the length of one fetch.

mod chromium;
mod driver;
mod manager;
mod pool;

#[cfg(test)]
pub(crate) mod fake;

pub use chromium::{ChromiumDriver, ChromiumLauncher};
pub use driver::{BrowserDriver, BrowserLauncher, Locator};
pub use manager::{RenderedPage, SessionHandle, SessionManager};
pub use pool::{SessionLease, SessionPool};
