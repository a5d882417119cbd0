//! Artifact emission.
//!
//! A build produces three files under the output directory:
//! `registry.json`, `tables.sql`, and `seeds.json`. Writes are whole-file
//! replacements; the output directory is created on demand.

use std::path::Path;

use indexmap::IndexMap;
use tracing::info;

use trialforge_schema::{Table, ddl_script};
use trialforge_shared::{Record, Result, TrialforgeError};

use crate::registry::Registry;

pub const REGISTRY_FILE: &str = "registry.json";
pub const TABLES_FILE: &str = "tables.sql";
pub const SEEDS_FILE: &str = "seeds.json";

/// Write all build artifacts under `out_dir`.
pub fn write_artifacts(
    out_dir: &Path,
    registry: &Registry,
    tables: &[Table],
    seeds: &IndexMap<String, Vec<Record>>,
) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|e| TrialforgeError::io(out_dir, e))?;

    write_json(&out_dir.join(REGISTRY_FILE), registry)?;
    write_file(&out_dir.join(TABLES_FILE), &ddl_script(tables))?;
    write_json(&out_dir.join(SEEDS_FILE), seeds)?;

    info!(out_dir = %out_dir.display(), "build artifacts written");
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    write_file(path, &content)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| TrialforgeError::io(path, e))
}
