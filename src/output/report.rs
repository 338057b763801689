use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::scoring::ProductScores;

/// JSON report written by `score --output`.
#[derive(Debug, Serialize)]
pub struct ScoreReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub products: &'a [ProductScores],
}

impl<'a> ScoreReport<'a> {
    pub fn new(products: &'a [ProductScores]) -> Self {
        Self {
            generated_at: Utc::now(),
            products,
        }
    }
}

/// Save a report to a JSON file atomically
///
/// Uses atomic-write-file so a reader never sees a half-written report.
/// Creates the parent directory if it doesn't exist.
pub fn save_report(path: &Path, report: &ScoreReport<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory at {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, report).context("Failed to serialize score report")?;

    file.commit()
        .with_context(|| format!("Failed to save score report to {}", path.display()))?;

    Ok(())
}
