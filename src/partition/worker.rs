use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::constants::LINE_TERMINATOR;
use crate::partition::registry::BucketRegistry;
use crate::partition::router::{normalize, route};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub lines_read: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub empty: usize,
    pub invalid_utf8: usize,
    pub write_errors: usize,
}

/// Reads one input file and appends every accepted line to its bucket.
#[derive(Clone)]
pub struct IngestWorker {
    registry: Arc<BucketRegistry>,
    classifier: Arc<dyn Classifier>,
    max_line_bytes: usize,
    io_buffer_size: usize,
}

impl IngestWorker {
    pub fn new(
        registry: Arc<BucketRegistry>,
        classifier: Arc<dyn Classifier>,
        max_line_bytes: usize,
        io_buffer_size: usize,
    ) -> Self {
        Self {
            registry,
            classifier,
            max_line_bytes,
            io_buffer_size,
        }
    }

    /// Processes `file_path` line by line.
    ///
    /// A failed bucket write drops only that line. A read failure, including a
    /// line longer than the configured limit, stops this file and is returned;
    /// lines appended before it stay in their buckets.
    pub fn process(&self, file_path: &Path) -> Result<FileReport> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open input file {}", file_path.display()))?;
        let mut reader = BufReader::with_capacity(self.io_buffer_size, file);
        let mut report = FileReport {
            path: file_path.to_path_buf(),
            ..FileReport::default()
        };

        let mut raw = Vec::new();
        loop {
            raw.clear();
            let read = read_bounded_line(&mut reader, &mut raw, self.max_line_bytes)
                .with_context(|| {
                    format!(
                        "Failed to read {} after {} lines",
                        file_path.display(),
                        report.lines_read
                    )
                })?;
            if read == 0 {
                break;
            }
            report.lines_read += 1;
            self.handle_line(&raw, &mut report);
        }

        debug!(
            "{}: {} lines, {} accepted, {} rejected",
            file_path.display(),
            report.lines_read,
            report.accepted,
            report.rejected
        );
        Ok(report)
    }

    fn handle_line(&self, raw: &[u8], report: &mut FileReport) {
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(_) => {
                report.invalid_utf8 += 1;
                return;
            }
        };

        let line = normalize(text);
        if line.is_empty() {
            report.empty += 1;
            return;
        }
        if !self.classifier.accept(&line) {
            report.rejected += 1;
            return;
        }

        let appended = self
            .registry
            .get_or_create(route(&line))
            .and_then(|bucket| bucket.append_line(&line));
        match appended {
            Ok(()) => report.accepted += 1,
            Err(e) => {
                report.write_errors += 1;
                warn!(
                    "⚠️ Dropping line {} of {}: {:#}",
                    report.lines_read,
                    report.path.display(),
                    e
                );
            }
        }
    }
}

/// Reads one line, terminator included, refusing lines longer than
/// `max_line_bytes` (terminator excluded). Returns 0 at end of input.
pub fn read_bounded_line<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_line_bytes: usize,
) -> io::Result<usize> {
    let limit = max_line_bytes as u64 + 1;
    let read = reader.by_ref().take(limit).read_until(LINE_TERMINATOR, buf)?;
    if read as u64 == limit && buf.last() != Some(&LINE_TERMINATOR) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds the {} byte limit", max_line_bytes),
        ));
    }
    Ok(read)
}
