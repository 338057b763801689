use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scoring::{ScoringSpec, SpecDocument, BUILTIN_SPEC};

/// Get the config directory path (~/.config/protein-rank/)
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("protein-rank"))
}

/// Get the default spec file path (~/.config/protein-rank/scoring_spec.yaml)
pub fn get_spec_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("scoring_spec.yaml"))
}

/// Where a loaded spec came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    File(PathBuf),
    Builtin,
}

impl std::fmt::Display for SpecSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecSource::File(path) => write!(f, "{}", path.display()),
            SpecSource::Builtin => f.write_str("built-in spec"),
        }
    }
}

/// Parse a scoring spec from YAML text.
pub fn parse_spec(yaml: &str) -> Result<ScoringSpec> {
    let document: SpecDocument =
        serde_saphyr::from_str(yaml).context("Failed to parse scoring spec: invalid YAML")?;
    Ok(document.scoring_spec)
}

/// Load a scoring spec from a YAML file.
pub fn load_spec_file(path: &Path) -> Result<ScoringSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scoring spec at {}", path.display()))?;

    parse_spec(&content).with_context(|| format!("Invalid scoring spec in {}", path.display()))
}

/// Load the scoring spec
///
/// # Arguments
///
/// * `path` - Optional explicit spec path. If None, uses
///   ~/.config/protein-rank/scoring_spec.yaml when it exists, otherwise the
///   spec bundled with the binary.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit spec file does not exist
/// - The spec file cannot be read
/// - The YAML cannot be parsed
pub fn load_spec(path: Option<PathBuf>) -> Result<(ScoringSpec, SpecSource)> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("Scoring spec not found at {}", path.display());
        }
        let spec = load_spec_file(&path)?;
        return Ok((spec, SpecSource::File(path)));
    }

    if let Some(default_path) = get_spec_path().filter(|p| p.exists()) {
        let spec = load_spec_file(&default_path)?;
        return Ok((spec, SpecSource::File(default_path)));
    }

    let spec = parse_spec(BUILTIN_SPEC).context("Built-in scoring spec is invalid")?;
    Ok((spec, SpecSource::Builtin))
}
