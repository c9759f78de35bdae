//! URL handling module for Press-Harvest
//!
//! This module derives post slugs, names publications after their host, and
//! applies the keyword exclusion filter to discovered URLs.

mod publication;
mod slug;

// Re-export main functions
pub use publication::{publication_name, publication_root};
pub use slug::{filter_excluded, is_excluded, slug_from_url};
