use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Lists the regular files directly under `dir` whose name ends with `suffix`
/// (case-insensitive), skipping `exclude_name`. Sorted by path.
pub fn discover_line_files(
    dir: &Path,
    suffix: &str,
    exclude_name: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let suffix = suffix.to_lowercase();
    let mut line_files = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list input directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to list input directory {}", dir.display()))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        if exclude_name.is_some_and(|excluded| name == excluded) {
            continue;
        }
        if name.to_lowercase().ends_with(&suffix) {
            line_files.push(path);
        }
    }

    line_files.sort();
    Ok(line_files)
}
