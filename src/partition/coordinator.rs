use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::partition::registry::{BucketFile, BucketRegistry};
use crate::partition::worker::{FileReport, IngestWorker};

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    /// Reports of the files that were read to the end, in input order.
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    pub tasks_panicked: usize,
    /// Every bucket created during the run, closed and ordered by id.
    pub buckets: Vec<BucketFile>,
}

impl FanOutReport {
    pub fn files_processed(&self) -> usize {
        self.files.len()
    }

    pub fn files_failed(&self) -> usize {
        self.failures.len() + self.tasks_panicked
    }
}

/// Runs one ingest worker per input file, never more than
/// `max_concurrent_files` at once, then closes the registry.
pub struct FanOutCoordinator {
    worker: IngestWorker,
    registry: Arc<BucketRegistry>,
    max_concurrent_files: usize,
}

impl FanOutCoordinator {
    pub fn new(
        worker: IngestWorker,
        registry: Arc<BucketRegistry>,
        max_concurrent_files: usize,
    ) -> Self {
        Self {
            worker,
            registry,
            max_concurrent_files: max_concurrent_files.max(1),
        }
    }

    pub async fn run(&self, input_files: &[PathBuf]) -> Result<FanOutReport> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_files));
        let mut tasks = JoinSet::new();

        debug!(
            "📋 Scheduling {} files with at most {} in flight",
            input_files.len(),
            self.max_concurrent_files
        );

        for (file_index, file_path) in input_files.iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;
            let worker = self.worker.clone();
            let file_path = file_path.clone();

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = worker.process(&file_path);
                (file_index, file_path, result)
            });
        }

        let mut completed = Vec::with_capacity(input_files.len());
        let mut report = FanOutReport::default();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((file_index, _, Ok(file_report))) => {
                    info!(
                        "📂 Processed {}: {} lines, {} kept",
                        file_report.path.display(),
                        file_report.lines_read,
                        file_report.accepted
                    );
                    completed.push((file_index, file_report));
                }
                Ok((_, file_path, Err(e))) => {
                    warn!("⚠️ Error processing file {}: {:#}", file_path.display(), e);
                    report.failures.push(FileFailure {
                        path: file_path,
                        error: format!("{:#}", e),
                    });
                }
                Err(e) => {
                    warn!("⚠️ Ingest task aborted or panicked: {}", e);
                    report.tasks_panicked += 1;
                }
            }
        }

        completed.sort_by_key(|(file_index, _)| *file_index);
        report.files = completed.into_iter().map(|(_, file_report)| file_report).collect();
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));

        report.buckets = self.registry.close_all();
        debug!("All workers finished, {} buckets closed", report.buckets.len());

        Ok(report)
    }
}
