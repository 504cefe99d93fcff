pub mod model;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use std::path::Path;

// Re-export main types
pub use self::model::{ClassifierConfig, IoConfig, LoggingConfig, ProcessingConfig, SiftConfig};

impl SiftConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
