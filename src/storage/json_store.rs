use crate::state::{ScrapeState, StateRecord};
use crate::storage::{atomic_write, StateStore, StorageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the state file inside a publication's markdown directory
pub const STATE_FILENAME: &str = ".scraping_state.json";

/// JSON-file state store for one publication
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Creates a store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the conventional location inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> ScrapeState {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state file at {:?}; starting fresh", self.path);
                return ScrapeState::new();
            }
            Err(err) => {
                tracing::error!("Failed to read state from {:?}: {}", self.path, err);
                return ScrapeState::new();
            }
        };

        let record: StateRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(err) => {
                tracing::error!("Failed to parse state from {:?}: {}", self.path, err);
                return ScrapeState::new();
            }
        };

        let state = ScrapeState::from(record);
        tracing::info!(
            "Loaded state from {:?}: {} processed post(s), watermark {}",
            self.path,
            state.processed_slugs.len(),
            state
                .latest_processed_date
                .as_ref()
                .map(|d| d.as_str())
                .unwrap_or("none")
        );
        state
    }

    fn commit(&self, state: &ScrapeState) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(&StateRecord::from(state))?;
        atomic_write(&self.path, &json)?;
        tracing::debug!("Committed state to {:?}", self.path);
        Ok(())
    }
}
