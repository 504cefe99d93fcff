use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::classifier::{self, Classifier};
use crate::config::SiftConfig;
use crate::discovery::discover_line_files;
use crate::partition::coordinator::{FanOutCoordinator, FanOutReport};
use crate::partition::merger::{BucketMerger, MergeReport};
use crate::partition::registry::{BucketFile, BucketRegistry};
use crate::partition::worker::IngestWorker;
use crate::partition::SiftStats;

/// Owns one run: discovery, fan-out into buckets, merge, scratch cleanup.
pub struct SiftProcessor {
    config: SiftConfig,
    classifier: Arc<dyn Classifier>,
}

impl SiftProcessor {
    pub fn new(config: SiftConfig, classifier: Arc<dyn Classifier>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, classifier })
    }

    /// Builds the processor with the classifier described by the config.
    pub fn from_config(config: SiftConfig) -> Result<Self> {
        let classifier = classifier::from_config(&config.classifier);
        Self::new(config, classifier)
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    pub async fn process(&self) -> Result<SiftStats> {
        let start_time = Instant::now();
        let input_dir = self.config.io.input_directory.clone();
        let scratch_dir = self.config.scratch_directory();
        let output_file = self.config.output_path();

        if input_dir.starts_with(&scratch_dir) {
            anyhow::bail!(
                "Scratch directory {} must not contain the input directory {}",
                scratch_dir.display(),
                input_dir.display()
            );
        }

        let input_files = discover_line_files(
            &input_dir,
            &self.config.io.line_suffix,
            Some(&self.config.io.output_file_name),
        )?;
        if input_files.is_empty() {
            warn!(
                "⚠️ No {} files found in {}",
                self.config.io.line_suffix,
                input_dir.display()
            );
        }

        std::fs::create_dir_all(&scratch_dir)
            .with_context(|| {
                format!("Failed to create scratch directory {}", scratch_dir.display())
            })?;

        info!("🔍 Input: {} ({} files)", input_dir.display(), input_files.len());
        debug!("Scratch directory: {}", scratch_dir.display());

        let registry = Arc::new(BucketRegistry::with_max_open(
            &scratch_dir,
            self.config.processing.max_open_buckets,
        ));

        let fan_out_start = Instant::now();
        let fan_out = match self.fan_out(&registry, &input_files).await {
            Ok(fan_out) => fan_out,
            Err(e) => {
                remove_scratch(&scratch_dir, &registry.close_all());
                return Err(e);
            }
        };
        let fan_out_time_ms = fan_out_start.elapsed().as_millis() as u64;

        let merge_start = Instant::now();
        let merged = self.merge(&fan_out, &output_file).await;
        let merge_time_ms = merge_start.elapsed().as_millis() as u64;

        remove_scratch(&scratch_dir, &fan_out.buckets);
        let merge = merged?;

        let stats = SiftStats::from_reports(
            input_files.len(),
            &fan_out,
            &merge,
            output_file,
            fan_out_time_ms,
            merge_time_ms,
            start_time.elapsed().as_millis() as u64,
        );

        info!(
            "✅ {} unique lines written to {}",
            stats.unique_lines,
            stats.output_file.display()
        );
        Ok(stats)
    }

    async fn fan_out(
        &self,
        registry: &Arc<BucketRegistry>,
        input_files: &[PathBuf],
    ) -> Result<FanOutReport> {
        let worker = IngestWorker::new(
            Arc::clone(registry),
            Arc::clone(&self.classifier),
            self.config.processing.max_line_bytes,
            self.config.io_buffer_size_bytes(),
        );
        let coordinator = FanOutCoordinator::new(
            worker,
            Arc::clone(registry),
            self.config.processing.max_concurrent_files,
        );
        coordinator.run(input_files).await
    }

    async fn merge(&self, fan_out: &FanOutReport, output_file: &Path) -> Result<MergeReport> {
        info!("🔗 Merging {} buckets", fan_out.buckets.len());

        let merger = BucketMerger::new(
            self.config.io_buffer_size_bytes(),
            self.config.processing.merge_parallelism,
        );
        let buckets = fan_out.buckets.clone();
        let output_file = output_file.to_path_buf();

        tokio::task::spawn_blocking(move || merger.merge_all(&buckets, &output_file)).await?
    }
}

/// Deletes the bucket files of this run, then the scratch directory if
/// nothing else is left in it. Files this run did not create are kept.
fn remove_scratch(scratch_dir: &Path, buckets: &[BucketFile]) {
    for bucket in buckets {
        if let Err(e) = std::fs::remove_file(&bucket.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("⚠️ Failed to remove bucket {}: {}", bucket.path.display(), e);
            }
        }
    }

    if !scratch_dir.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir(scratch_dir) {
        warn!(
            "⚠️ Scratch directory {} kept, it is not empty or not removable: {}",
            scratch_dir.display(),
            e
        );
    }
}
