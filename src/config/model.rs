use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use anyhow::Result;
use crate::constants::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    pub io: IoConfig,
    pub processing: ProcessingConfig,
    pub classifier: ClassifierConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_directory: PathBuf,
    /// Defaults to `<input_directory>/temp` when unset.
    pub scratch_directory: Option<PathBuf>,
    pub output_file_name: String,
    pub line_suffix: String,
    pub io_buffer_size_kb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub max_line_bytes: usize,
    pub max_concurrent_files: usize,
    /// Bucket writers allowed to hold a file descriptor at once.
    pub max_open_buckets: usize,
    pub merge_parallelism: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub accept_all: bool,
    pub required_suffix: String,
    pub denied_domains: Vec<String>,
    pub trap_words: Vec<String>,
    pub rare_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbosity: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_directory: PathBuf::from(DEFAULT_INPUT_DIRECTORY),
            scratch_directory: None,
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            line_suffix: DEFAULT_LINE_SUFFIX.to_string(),
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            max_open_buckets: DEFAULT_MAX_OPEN_BUCKETS,
            merge_parallelism: DEFAULT_MERGE_PARALLELISM,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            accept_all: false,
            required_suffix: DEFAULT_REQUIRED_SUFFIX.to_string(),
            denied_domains: owned(DEFAULT_DENIED_DOMAINS),
            trap_words: owned(DEFAULT_TRAP_WORDS),
            rare_names: owned(DEFAULT_RARE_NAMES),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbosity: VERBOSITY_NORMAL.to_string(),
        }
    }
}

impl SiftConfig {
    pub fn with_input_directory(mut self, input_directory: impl Into<PathBuf>) -> Self {
        self.io.input_directory = input_directory.into();
        self
    }

    pub fn scratch_directory(&self) -> PathBuf {
        self.io
            .scratch_directory
            .clone()
            .unwrap_or_else(|| self.io.input_directory.join(SCRATCH_DIR_NAME))
    }

    pub fn output_path(&self) -> PathBuf {
        self.io.input_directory.join(&self.io.output_file_name)
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io.io_buffer_size_kb * BYTES_PER_KB
    }

    pub fn validate(&self) -> Result<()> {
        let name = &self.io.output_file_name;
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(anyhow::anyhow!(
                "Output file name must be a plain, non-empty file name: {:?}",
                name
            ));
        }

        if self.io.line_suffix.is_empty() {
            return Err(anyhow::anyhow!("Line file suffix must not be empty"));
        }

        if self.io.io_buffer_size_kb < MIN_IO_BUFFER_SIZE_KB
            || self.io.io_buffer_size_kb > MAX_IO_BUFFER_SIZE_KB {
            return Err(anyhow::anyhow!(
                "IO buffer size must be between {} and {} KB",
                MIN_IO_BUFFER_SIZE_KB, MAX_IO_BUFFER_SIZE_KB
            ));
        }

        if self.processing.max_line_bytes < MIN_MAX_LINE_BYTES
            || self.processing.max_line_bytes > MAX_MAX_LINE_BYTES {
            return Err(anyhow::anyhow!(
                "Maximum line length must be between {} and {} bytes",
                MIN_MAX_LINE_BYTES, MAX_MAX_LINE_BYTES
            ));
        }

        if self.processing.max_concurrent_files < MIN_CONCURRENT_FILES
            || self.processing.max_concurrent_files > MAX_CONCURRENT_FILES {
            return Err(anyhow::anyhow!(
                "Concurrent files must be between {} and {}",
                MIN_CONCURRENT_FILES, MAX_CONCURRENT_FILES
            ));
        }

        if self.processing.max_open_buckets < MIN_MAX_OPEN_BUCKETS
            || self.processing.max_open_buckets > MAX_MAX_OPEN_BUCKETS {
            return Err(anyhow::anyhow!(
                "Open bucket limit must be between {} and {}",
                MIN_MAX_OPEN_BUCKETS, MAX_MAX_OPEN_BUCKETS
            ));
        }

        // Every busy file pins one writer; one more must stay idle to park.
        if self.processing.max_open_buckets <= self.processing.max_concurrent_files {
            return Err(anyhow::anyhow!(
                "Open bucket limit ({}) must exceed concurrent files ({})",
                self.processing.max_open_buckets,
                self.processing.max_concurrent_files
            ));
        }

        if self.processing.merge_parallelism < MIN_MERGE_PARALLELISM
            || self.processing.merge_parallelism > MAX_MERGE_PARALLELISM {
            return Err(anyhow::anyhow!(
                "Merge parallelism must be between {} and {}",
                MIN_MERGE_PARALLELISM, MAX_MERGE_PARALLELISM
            ));
        }

        match self.logging.verbosity.as_str() {
            VERBOSITY_SILENT | VERBOSITY_NORMAL | VERBOSITY_VERBOSE => Ok(()),
            other => Err(anyhow::anyhow!("Unknown verbosity level: {}", other)),
        }
    }
}
