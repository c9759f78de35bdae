//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `ScrapeState`: What has already been harvested from a publication, plus the date watermark
//! - `FetchOutcome`: The immutable result of fetching one post
//! - `SessionState` / `AuthStatus` / `AuthPhase`: Browser session and authentication state machines

mod outcome;
mod scrape_state;
mod session_state;

// Re-export main types
pub use outcome::{ExtractedPost, FailureReason, FetchOutcome};
pub(crate) use scrape_state::StateRecord;
pub use scrape_state::{DateKey, ScrapeState};
pub use session_state::{AuthPhase, AuthStatus, SessionState};
