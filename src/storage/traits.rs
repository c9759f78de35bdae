//! Storage traits and error types
//!
//! This module defines the trait interface for state backends and associated
//! error types.

use crate::state::ScrapeState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output directory unusable: {0}")]
    OutputDir(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for per-publication state backends
///
/// Implementations must make `commit` atomic: a crash mid-write leaves the
/// previously committed state intact.
pub trait StateStore: Send + Sync {
    /// Loads the committed state
    ///
    /// A missing or unreadable state is not an error: the problem is logged and
    /// an empty state is returned so the run proceeds as a first run.
    fn load(&self) -> ScrapeState;

    /// Replaces the committed state
    ///
    /// # Arguments
    ///
    /// * `state` - The full state to persist
    fn commit(&self, state: &ScrapeState) -> StorageResult<()>;
}
