use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::constants::{BYTES_PER_KB, LINE_TERMINATOR, OUTPUT_BUFFER_SIZE_KB};
use crate::partition::registry::BucketFile;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub buckets_merged: usize,
    pub buckets_failed: usize,
    /// Merged buckets whose file missed lines that failed to flush.
    pub buckets_incomplete: usize,
    pub lines_read: usize,
    pub unique_lines: usize,
    pub duplicates_removed: usize,
}

/// Unique content of one bucket.
#[derive(Debug, Default)]
pub struct DedupedBucket {
    pub lines_read: usize,
    pub unique: HashSet<String>,
}

pub struct BucketMerger {
    io_buffer_size: usize,
    parallelism: usize,
}

impl BucketMerger {
    pub fn new(io_buffer_size: usize, parallelism: usize) -> Self {
        Self {
            io_buffer_size,
            parallelism: parallelism.max(1),
        }
    }

    /// Deduplicates every bucket into `output_file`.
    ///
    /// A bucket that cannot be read or written is skipped; failing to create
    /// or flush the output is an error.
    pub fn merge_all(&self, buckets: &[BucketFile], output_file: &Path) -> Result<MergeReport> {
        let output = File::create(output_file)
            .with_context(|| format!("Failed to create output file {}", output_file.display()))?;
        let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE_KB * BYTES_PER_KB, output);

        let report = self.merge_into(buckets, &mut writer);

        writer
            .flush()
            .with_context(|| format!("Failed to flush output file {}", output_file.display()))?;

        Ok(report)
    }

    /// Buckets are read `parallelism` at a time and written one after the
    /// other. Each bucket goes out in a single `write_all`, so a rejected
    /// write leaves none of that bucket behind.
    pub fn merge_into<W: Write>(&self, buckets: &[BucketFile], writer: &mut W) -> MergeReport {
        let mut report = MergeReport::default();

        for window in buckets.chunks(self.parallelism) {
            let deduped: Vec<(&BucketFile, Result<DedupedBucket>)> = window
                .par_iter()
                .map(|bucket| (bucket, self.dedup_bucket(&bucket.path)))
                .collect();

            for (bucket, result) in deduped {
                let deduped = match result {
                    Ok(deduped) => deduped,
                    Err(e) => {
                        warn!("⚠️ Skipping bucket {}: {:#}", bucket.id, e);
                        report.buckets_failed += 1;
                        continue;
                    }
                };

                if let Err(e) = writer.write_all(&render_lines(&deduped.unique)) {
                    warn!("⚠️ Failed writing bucket {} to output: {}", bucket.id, e);
                    report.buckets_failed += 1;
                    continue;
                }

                if !bucket.complete {
                    warn!("⚠️ Bucket {} was merged from a partially flushed file", bucket.id);
                    report.buckets_incomplete += 1;
                }
                report.buckets_merged += 1;
                report.lines_read += deduped.lines_read;
                report.unique_lines += deduped.unique.len();
                report.duplicates_removed += deduped.lines_read - deduped.unique.len();
                debug!(
                    "Bucket {}: {} lines, {} unique",
                    bucket.id,
                    deduped.lines_read,
                    deduped.unique.len()
                );
            }
        }

        report
    }

    pub fn dedup_bucket(&self, path: &Path) -> Result<DedupedBucket> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open bucket {}", path.display()))?;
        let reader = BufReader::with_capacity(self.io_buffer_size, file);
        let mut deduped = DedupedBucket::default();

        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read bucket {}", path.display()))?;
            if line.is_empty() {
                continue;
            }
            deduped.lines_read += 1;
            deduped.unique.insert(line);
        }

        Ok(deduped)
    }
}

fn render_lines(lines: &HashSet<String>) -> Vec<u8> {
    let size = lines.iter().map(|line| line.len() + 1).sum();
    let mut rendered = Vec::with_capacity(size);
    for line in lines {
        rendered.extend_from_slice(line.as_bytes());
        rendered.push(LINE_TERMINATOR);
    }
    rendered
}
