//! Per-item fetch results
//!
//! A [`FetchOutcome`] is produced exactly once per work item and never
//! mutated afterwards.

use super::DateKey;
use std::fmt;

/// Fields pulled out of a rendered post page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPost {
    pub title: String,
    pub subtitle: String,
    /// The date text as shown on the page (or "Date not found")
    pub raw_date: String,
    /// Normalized date; the sentinel when the page date was undeterminable
    pub date: DateKey,
    pub like_count: String,
    /// HTML of the post body container
    pub content_html: String,
}

/// Result of fetching one work item
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Page rendered and extracted
    Success(ExtractedPost),

    /// Page is behind a paywall that could not be lifted
    SkippedPaywalled,

    /// An artifact for this slug appeared on disk before the fetch started
    SkippedAlreadyPresent,

    /// Fetch failed; the item is skipped and siblings carry on
    Failed { reason: FailureReason },
}

impl FetchOutcome {
    /// Returns true for a successful extraction
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true for either skip kind
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedPaywalled | Self::SkippedAlreadyPresent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short label used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::SkippedPaywalled => "skipped_paywalled",
            Self::SkippedAlreadyPresent => "skipped_already_present",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The browser session dropped and one reconnect did not bring it back
    SessionLost,

    /// A session operation exceeded its bounded wait
    Timeout { operation: String },

    /// Navigation was rejected by the browser
    Navigation(String),

    /// The page rendered but the post could not be extracted
    Extraction(String),

    /// Extraction succeeded but the artifacts could not be written
    Output(String),

    /// The worker task itself died
    Other(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionLost => write!(f, "browser session lost"),
            Self::Timeout { operation } => write!(f, "timed out during {}", operation),
            Self::Navigation(msg) => write!(f, "navigation failed: {}", msg),
            Self::Extraction(msg) => write!(f, "extraction failed: {}", msg),
            Self::Output(msg) => write!(f, "writing artifacts failed: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}
