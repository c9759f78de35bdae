//! Output module for persisting harvested posts
//!
//! This module handles:
//! - Rendering posts as markdown and standalone HTML artifacts
//! - Maintaining the aggregated per-publication results file
//! - Summarizing each publication run

mod artifacts;
mod markdown;
mod results;
pub mod stats;
mod traits;

pub use artifacts::FileOutputHandler;
pub use markdown::{render_html, render_markdown, stylesheet_href};
pub use results::merge_results;
pub use stats::{print_summary, RunSummary};
pub use traits::{OutputError, OutputHandler, OutputResult, PostRecord};
