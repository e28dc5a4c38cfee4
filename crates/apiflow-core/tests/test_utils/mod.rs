//! Test utilities for apiflow integration tests

// Internal imports (std, crate)
use std::fs;
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::Context;
use apiflow_core::{Delimiter, GenerationOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

/// Creates a temporary directory for test fixtures
pub fn create_temp_dir() -> anyhow::Result<(TempDir, PathBuf)> {
    let temp_dir = tempfile::tempdir()?;
    let temp_path = temp_dir.path().to_path_buf();
    Ok((temp_dir, temp_path))
}

/// Writes a generation options file the way an importer would ship one
pub fn create_options_file(dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join("apiflow.yaml");
    let content = r#"
variable_delimiters:
  - ["{", "}"]
  - ["{{", "}}"]
use_default: true
seed: 1234
"#;
    fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Loads options from disk, leaving parsing to the library
pub fn load_options(path: &Path) -> anyhow::Result<GenerationOptions> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(GenerationOptions::from_yaml_str(&content)?)
}

pub fn braces() -> Vec<Delimiter> {
    vec![Delimiter::braces()]
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
