//! Output handler traits and types
//!
//! This module defines the trait interface for persisting harvested posts and
//! the record each accepted post contributes to the aggregated results file.

use crate::crawler::WorkItem;
use crate::state::ExtractedPost;
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to format output: {0}")]
    Format(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One entry of the aggregated results file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub title: String,
    pub subtitle: String,
    pub like_count: String,
    /// Date as shown on the page
    pub date: String,
    /// Normalized `YYYYMMDD` date
    pub date_str: String,
    pub url: String,
    /// Path of the markdown artifact
    pub file_link: String,
    /// Path of the HTML artifact
    pub html_link: String,
}

/// Trait for post persistence backends
///
/// Implementations must be thread-safe.
pub trait OutputHandler: Send + Sync {
    /// Writes the artifacts of one accepted post
    ///
    /// An existing markdown artifact is left untouched.
    ///
    /// # Arguments
    ///
    /// * `item` - The work item the post was fetched for
    /// * `post` - The extracted post
    ///
    /// # Returns
    ///
    /// The record describing the written artifacts
    fn write_post(&self, item: &WorkItem, post: &ExtractedPost) -> OutputResult<PostRecord>;

    /// Merges records into the aggregated results, skipping exact duplicates
    fn append_results(&self, records: &[PostRecord]) -> OutputResult<()>;
}
