//! File-based output handler
//!
//! Writes one markdown and one HTML artifact per accepted post, named
//! `{YYYYMMDD}-{slug}.{ext}`, and keeps the publication's aggregated results
//! file up to date.

use super::markdown::{render_html, render_markdown, stylesheet_href};
use super::results::merge_results;
use super::traits::{OutputHandler, OutputResult, PostRecord};
use crate::config::OutputConfig;
use crate::crawler::WorkItem;
use crate::state::ExtractedPost;
use crate::storage::{atomic_write, ensure_dir};
use std::path::{Path, PathBuf};

/// Output handler writing artifacts to per-publication directories
#[derive(Debug, Clone)]
pub struct FileOutputHandler {
    markdown_dir: PathBuf,
    html_dir: PathBuf,
    results_path: PathBuf,
}

impl FileOutputHandler {
    /// Creates a handler with explicit locations
    pub fn new(markdown_dir: PathBuf, html_dir: PathBuf, results_path: PathBuf) -> Self {
        Self {
            markdown_dir,
            html_dir,
            results_path,
        }
    }

    /// Creates the handler for one publication
    ///
    /// # Arguments
    ///
    /// * `output` - Output directory configuration
    /// * `name` - Publication name, used as the subdirectory and results file stem
    pub fn for_publication(output: &OutputConfig, name: &str) -> Self {
        Self::new(
            Path::new(&output.markdown_dir).join(name),
            Path::new(&output.html_dir).join(name),
            Path::new(&output.data_dir).join(format!("{}.json", name)),
        )
    }

    /// Directory holding the markdown artifacts (and the state file)
    pub fn markdown_dir(&self) -> &Path {
        &self.markdown_dir
    }

    pub fn html_dir(&self) -> &Path {
        &self.html_dir
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    fn artifact_name(post: &ExtractedPost, item: &WorkItem, ext: &str) -> String {
        format!("{}-{}.{}", post.date.as_str(), item.slug, ext)
    }
}

impl OutputHandler for FileOutputHandler {
    fn write_post(&self, item: &WorkItem, post: &ExtractedPost) -> OutputResult<PostRecord> {
        ensure_dir(&self.markdown_dir)?;
        ensure_dir(&self.html_dir)?;

        let md_path = self.markdown_dir.join(Self::artifact_name(post, item, "md"));
        if md_path.exists() {
            tracing::info!("Markdown file already exists, keeping it: {:?}", md_path);
        } else {
            atomic_write(&md_path, &render_markdown(post))?;
        }

        let html_path = self.html_dir.join(Self::artifact_name(post, item, "html"));
        atomic_write(&html_path, &render_html(post, &stylesheet_href(&self.html_dir)))?;

        tracing::debug!("Wrote artifacts for {} as {:?}", item.url, md_path);

        Ok(PostRecord {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            like_count: post.like_count.clone(),
            date: post.raw_date.clone(),
            date_str: post.date.as_str().to_string(),
            url: item.url.clone(),
            file_link: md_path.display().to_string(),
            html_link: html_path.display().to_string(),
        })
    }

    fn append_results(&self, records: &[PostRecord]) -> OutputResult<()> {
        let added = merge_results(&self.results_path, records)?;
        tracing::info!(
            "Results file {:?} updated with {} new record(s)",
            self.results_path,
            added
        );
        Ok(())
    }
}
