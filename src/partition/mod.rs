pub mod router;
pub mod registry;
pub mod worker;
pub mod coordinator;
pub mod merger;
pub mod processor;


pub use coordinator::{FanOutCoordinator, FanOutReport, FileFailure};
pub use merger::{BucketMerger, MergeReport};
pub use processor::SiftProcessor;
pub use registry::{BucketFile, BucketHandle, BucketRegistry};
pub use router::{normalize, route, BucketId};
pub use worker::{FileReport, IngestWorker};

use anyhow::Result;
use std::path::PathBuf;

use crate::config::SiftConfig;

#[derive(Debug, Clone, Default)]
pub struct SiftStats {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub lines_read: usize,
    pub lines_accepted: usize,
    pub lines_rejected: usize,
    pub empty_lines: usize,
    pub invalid_utf8_lines: usize,
    pub write_errors: usize,
    pub buckets_created: usize,
    pub buckets_merged: usize,
    pub buckets_failed: usize,
    pub buckets_incomplete: usize,
    pub unique_lines: usize,
    pub duplicates_removed: usize,
    pub fan_out_time_ms: u64,
    pub merge_time_ms: u64,
    pub processing_time_ms: u64,
    pub output_file: PathBuf,
}

impl SiftStats {
    fn from_reports(
        files_discovered: usize,
        fan_out: &FanOutReport,
        merge: &MergeReport,
        output_file: PathBuf,
        fan_out_time_ms: u64,
        merge_time_ms: u64,
        processing_time_ms: u64,
    ) -> Self {
        let mut stats = Self {
            files_discovered,
            files_processed: fan_out.files_processed(),
            files_failed: fan_out.files_failed(),
            buckets_created: fan_out.buckets.len(),
            buckets_merged: merge.buckets_merged,
            buckets_failed: merge.buckets_failed,
            buckets_incomplete: merge.buckets_incomplete,
            unique_lines: merge.unique_lines,
            duplicates_removed: merge.duplicates_removed,
            fan_out_time_ms,
            merge_time_ms,
            processing_time_ms,
            output_file,
            ..Self::default()
        };

        for file in &fan_out.files {
            stats.lines_read += file.lines_read;
            stats.lines_accepted += file.accepted;
            stats.lines_rejected += file.rejected;
            stats.empty_lines += file.empty;
            stats.invalid_utf8_lines += file.invalid_utf8;
            stats.write_errors += file.write_errors;
        }

        stats
    }
}

/// Runs the whole pipeline over `config.io.input_directory` using the
/// classifier described by the config.
pub async fn sift_directory(config: SiftConfig) -> Result<SiftStats> {
    SiftProcessor::from_config(config)?.process().await
}
