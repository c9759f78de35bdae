use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of the artifacts the inventory tracks
const ARTIFACT_EXT: &str = "md";

/// Width of the `YYYYMMDD-` filename prefix
const DATE_PREFIX_LEN: usize = 9;

/// Slugs already materialized as markdown artifacts in an output directory
///
/// Built independently of the state file, so posts written by a run whose
/// state commit failed are still recognized.
#[derive(Debug, Clone, Default)]
pub struct ArtifactInventory {
    dir: PathBuf,
    slugs: HashSet<String>,
    legacy_files: HashSet<String>,
}

impl ArtifactInventory {
    /// Scans `dir` for markdown artifacts
    ///
    /// Both `YYYYMMDD-<slug>.md` and legacy `<slug>.md` names are recognized.
    /// A missing or unreadable directory yields an empty inventory.
    pub fn scan(dir: &Path) -> Self {
        let mut inventory = Self {
            dir: dir.to_path_buf(),
            ..Default::default()
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("No artifacts scanned in {:?}: {}", dir, err);
                return inventory;
            }
        };

        let mut files = 0usize;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(slug) = slug_from_artifact_name(&name) else {
                continue;
            };
            files += 1;
            if !has_date_prefix(&name) {
                inventory.legacy_files.insert(name.clone());
            }
            inventory.slugs.insert(slug.to_string());
        }

        tracing::info!(
            "Found {} existing slug(s) in {} markdown file(s) under {:?}",
            inventory.slugs.len(),
            files,
            dir
        );
        inventory
    }

    /// Returns true if any artifact (dated or legacy) exists for the slug
    pub fn contains_slug(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    /// Returns true if the exact legacy filename `<slug>.md` exists
    pub fn has_legacy_file(&self, slug: &str) -> bool {
        self.legacy_files.contains(&legacy_filename(slug))
    }

    pub fn slugs(&self) -> &HashSet<String> {
        &self.slugs
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

/// Checks the directory right now for an artifact of `slug`
///
/// Used just before a fetch, to catch artifacts written after the inventory
/// scan (for example by an overlapping run).
pub fn artifact_exists(dir: &Path, slug: &str) -> bool {
    if dir.join(legacy_filename(slug)).exists() {
        return true;
    }
    match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().any(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            has_date_prefix(&name) && slug_from_artifact_name(&name) == Some(slug)
        }),
        Err(_) => false,
    }
}

fn legacy_filename(slug: &str) -> String {
    format!("{}.{}", slug, ARTIFACT_EXT)
}

fn has_date_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > DATE_PREFIX_LEN
        && bytes[8] == b'-'
        && bytes[..8].iter().all(|b| b.is_ascii_digit())
}

/// Recovers the slug from an artifact filename, or None for non-artifacts
fn slug_from_artifact_name(name: &str) -> Option<&str> {
    let stem = name.strip_suffix(&format!(".{}", ARTIFACT_EXT))?;
    let slug = if has_date_prefix(name) {
        &stem[DATE_PREFIX_LEN..]
    } else {
        stem
    };
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}
