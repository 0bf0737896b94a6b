//! Run dataset persistence — one JSON document per run.
//!
//! The document's top-level keys are source ids, each holding the full
//! record-set shape. Image evidence stays on disk as files referenced by
//! path; nothing is inlined.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use rivalwatch_common::AggregatedDataset;

pub struct DatasetWriter {
    dir: PathBuf,
}

impl DatasetWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `competitor_data_<yyyymmdd>.json` and return its path.
    pub fn write(&self, dataset: &AggregatedDataset) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data dir {}", self.dir.display()))?;

        let date = Utc::now().format("%Y%m%d");
        let path = self.dir.join(format!("competitor_data_{date}.json"));
        let json = serde_json::to_string_pretty(dataset).context("Failed to serialize dataset")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write dataset {}", path.display()))?;

        info!(path = %path.display(), sources = dataset.len(), "Run dataset written");
        Ok(path)
    }
}
