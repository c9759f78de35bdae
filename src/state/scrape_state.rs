//! Per-publication harvest state
//!
//! This module defines the watermark date key and the record of which posts
//! have already been processed.

use crate::url::slug_from_url;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A normalized `YYYYMMDD` date used for filenames and watermark comparison
///
/// Lexicographic order equals chronological order, so the derived `Ord` is
/// the date order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    /// Key assigned to posts whose date cannot be determined
    pub const SENTINEL: &'static str = "19700101";

    /// Parses an eight-digit `YYYYMMDD` key
    ///
    /// Returns None for anything that is not exactly eight ASCII digits.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// The sentinel key for undated posts
    pub fn sentinel() -> Self {
        Self(Self::SENTINEL.to_string())
    }

    /// Builds a key from a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%Y%m%d").to_string())
    }

    /// Returns true if this is the undated sentinel
    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::SENTINEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record of everything already harvested from one publication
///
/// `processed_slugs` always covers the slugs of `processed_urls`; [`ScrapeState::record`]
/// maintains this and loading repairs older files that violate it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeState {
    pub processed_urls: BTreeSet<String>,
    pub processed_slugs: BTreeSet<String>,
    /// Watermark: newest date among accepted posts; never the sentinel
    pub latest_processed_date: Option<DateKey>,
    pub latest_processed_url: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl ScrapeState {
    /// Creates an empty state for a first run
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if either the URL or its slug has been processed
    pub fn is_processed(&self, url: &str, slug: &str) -> bool {
        self.processed_urls.contains(url) || self.processed_slugs.contains(slug)
    }

    /// Records an accepted post and advances the watermark if it is newer
    ///
    /// Sentinel dates are recorded as processed but never become the watermark.
    pub fn record(&mut self, url: &str, date: &DateKey) {
        self.processed_urls.insert(url.to_string());
        self.processed_slugs.insert(slug_from_url(url));

        if date.is_sentinel() {
            return;
        }

        let newer = match &self.latest_processed_date {
            Some(current) => date > current,
            None => true,
        };
        if newer {
            self.latest_processed_date = Some(date.clone());
            self.latest_processed_url = Some(url.to_string());
        }
    }

    /// Stamps the state with the current time
    pub fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }

    /// Restores the slug-superset invariant
    fn repair_slugs(&mut self) {
        let missing: Vec<String> = self
            .processed_urls
            .iter()
            .map(|url| slug_from_url(url))
            .filter(|slug| !self.processed_slugs.contains(slug))
            .collect();
        if !missing.is_empty() {
            tracing::debug!("Repairing {} slug(s) missing from state", missing.len());
            self.processed_slugs.extend(missing);
        }
    }
}

/// On-disk shape of the state file
///
/// Parsed leniently: missing keys default, empty strings mean "unset", and an
/// unparseable timestamp is dropped rather than rejecting the whole file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct StateRecord {
    latest_post_date: Option<String>,
    latest_post_url: Option<String>,
    scraped_urls: Vec<String>,
    scraped_slugs: Vec<String>,
    last_update: Option<String>,
}

impl From<&ScrapeState> for StateRecord {
    fn from(state: &ScrapeState) -> Self {
        Self {
            latest_post_date: state
                .latest_processed_date
                .as_ref()
                .map(|d| d.as_str().to_string()),
            latest_post_url: state.latest_processed_url.clone(),
            scraped_urls: state.processed_urls.iter().cloned().collect(),
            scraped_slugs: state.processed_slugs.iter().cloned().collect(),
            last_update: state.last_update.map(|t| t.to_rfc3339()),
        }
    }
}

impl From<StateRecord> for ScrapeState {
    fn from(record: StateRecord) -> Self {
        let latest_processed_date = record
            .latest_post_date
            .as_deref()
            .and_then(DateKey::parse)
            .filter(|d| !d.is_sentinel());
        let latest_processed_url = record.latest_post_url.filter(|u| !u.is_empty());
        let last_update = record.last_update.as_deref().and_then(parse_timestamp);

        let mut state = ScrapeState {
            processed_urls: record.scraped_urls.into_iter().collect(),
            processed_slugs: record.scraped_slugs.into_iter().collect(),
            latest_processed_date,
            latest_processed_url,
            last_update,
        };
        state.repair_slugs();
        state
    }
}

/// Accepts RFC 3339 and naive ISO-8601 timestamps (assumed UTC)
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
