use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::types::FactRecord;

/// Path of a brand's fact file inside the data directory
/// (`<data_dir>/<brand>/<brand>.json`).
pub fn fact_file_path(data_dir: &Path, brand: &str) -> PathBuf {
    data_dir.join(brand).join(format!("{}.json", brand))
}

/// Load a single fact record from a JSON file.
///
/// Records without a `brand` field take the file stem as their brand.
pub fn load_fact_record(path: &Path) -> Result<FactRecord> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open fact file at {}", path.display()))?;

    let mut record: FactRecord = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse fact file: invalid JSON in {}", path.display()))?;

    if record.brand.is_none() {
        record.brand = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string);
    }

    Ok(record)
}

/// Find every `<brand>/<brand>.json` file directly under `data_dir`, sorted by path.
pub fn discover_fact_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        anyhow::bail!("Data directory not found at {}", data_dir.display());
    }

    let pattern = data_dir.join("*").join("*.json");
    let pattern = pattern.to_string_lossy();

    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid data directory pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|path| is_brand_file(path))
        .collect();

    paths.sort();
    Ok(paths)
}

fn is_brand_file(path: &Path) -> bool {
    let stem = path.file_stem().and_then(|s| s.to_str());
    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str());
    match (stem, parent) {
        (Some(stem), Some(parent)) => stem == parent && !parent.starts_with('.'),
        _ => false,
    }
}

/// Load every brand fact file in `data_dir`.
///
/// Files that fail to load are skipped with a warning so one broken
/// extraction does not hide the rest.
pub fn load_fact_dir(data_dir: &Path) -> Result<Vec<FactRecord>> {
    let paths = discover_fact_files(data_dir)?;
    let mut records = Vec::with_capacity(paths.len());

    for path in paths {
        match load_fact_record(&path) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    tracing::debug!(count = records.len(), dir = %data_dir.display(), "loaded fact records");
    Ok(records)
}
