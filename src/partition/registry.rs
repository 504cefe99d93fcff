use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::constants::{
    BUCKET_FILE_EXTENSION, BUCKET_WRITE_BUFFER_SIZE_KB, BYTES_PER_KB, DEFAULT_MAX_OPEN_BUCKETS,
    LINE_TERMINATOR,
};
use crate::partition::router::BucketId;

/// A bucket file left behind by [`BucketRegistry::close_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFile {
    pub id: BucketId,
    pub path: PathBuf,
    pub lines: usize,
    /// False when buffered lines could not be flushed, so the file holds
    /// fewer than `lines` entries.
    pub complete: bool,
}

enum WriterState {
    /// File exists on disk but holds no descriptor.
    Parked,
    Open(BufWriter<File>),
    Closed,
}

/// Open descriptors shared by every bucket of one registry. Once `max_open`
/// writers are open the least recently used idle one is parked.
struct WriterSlots {
    max_open: usize,
    clock: AtomicU64,
    open: Mutex<HashMap<BucketId, Weak<BucketHandle>>>,
}

impl WriterSlots {
    fn new(max_open: usize) -> Self {
        Self {
            max_open: max_open.max(1),
            clock: AtomicU64::new(0),
            open: Mutex::new(HashMap::new()),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn open_count(&self) -> usize {
        self.open.lock().len()
    }

    /// Makes room for `handle` and records it as open. The caller holds the
    /// handle's own lock, so other handles are only ever `try_lock`ed here.
    fn reserve(&self, id: BucketId, handle: Weak<BucketHandle>) {
        let mut open = self.open.lock();
        while open.len() >= self.max_open {
            if !Self::park_least_recent(&mut open) {
                debug!("No idle bucket writer to park, {} open", open.len());
                break;
            }
        }
        open.insert(id, handle);
    }

    fn release(&self, id: BucketId) {
        self.open.lock().remove(&id);
    }

    fn park_least_recent(open: &mut HashMap<BucketId, Weak<BucketHandle>>) -> bool {
        let mut candidates: Vec<(u64, BucketId, Arc<BucketHandle>)> =
            Vec::with_capacity(open.len());
        open.retain(|id, weak| match weak.upgrade() {
            Some(handle) => {
                candidates.push((handle.last_used.load(Ordering::Relaxed), *id, handle));
                true
            }
            None => false,
        });
        candidates.sort_by_key(|(last_used, id, _)| (*last_used, *id));

        for (_, id, handle) in candidates {
            let Some(mut state) = handle.state.try_lock() else {
                continue;
            };
            if matches!(*state, WriterState::Open(_)) {
                let parked = std::mem::replace(&mut *state, WriterState::Parked);
                if let WriterState::Open(writer) = parked {
                    handle.finish(writer);
                }
            }
            open.remove(&id);
            return true;
        }
        false
    }
}

/// Append handle for one bucket. Appends are serialised per bucket; the
/// descriptor may be parked between appends and is reopened in append mode.
pub struct BucketHandle {
    id: BucketId,
    path: PathBuf,
    this: Weak<BucketHandle>,
    slots: Arc<WriterSlots>,
    state: Mutex<WriterState>,
    lines_appended: AtomicUsize,
    last_used: AtomicU64,
    flush_failed: AtomicBool,
}

impl std::fmt::Debug for BucketHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("lines_appended", &self.lines_appended())
            .finish()
    }
}

impl BucketHandle {
    fn create(id: BucketId, path: PathBuf, slots: Arc<WriterSlots>) -> Result<Arc<Self>> {
        File::create(&path)
            .with_context(|| format!("Failed to create bucket file {}", path.display()))?;
        Ok(Arc::new_cyclic(|this| Self {
            id,
            path,
            this: this.clone(),
            slots,
            state: Mutex::new(WriterState::Parked),
            lines_appended: AtomicUsize::new(0),
            last_used: AtomicU64::new(0),
            flush_failed: AtomicBool::new(false),
        }))
    }

    pub fn id(&self) -> BucketId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_appended(&self) -> usize {
        self.lines_appended.load(Ordering::Relaxed)
    }

    /// Appends `line` and its terminator as a single write.
    pub fn append_line(&self, line: &str) -> Result<()> {
        let mut record = Vec::with_capacity(line.len() + 1);
        record.extend_from_slice(line.as_bytes());
        record.push(LINE_TERMINATOR);

        let mut state = self.state.lock();
        if matches!(*state, WriterState::Parked) {
            *state = WriterState::Open(self.reopen()?);
        }
        let writer = match &mut *state {
            WriterState::Open(writer) => writer,
            _ => anyhow::bail!("Bucket {} is already closed", self.id),
        };
        writer
            .write_all(&record)
            .with_context(|| format!("Failed to append to bucket {}", self.path.display()))?;
        self.last_used.store(self.slots.tick(), Ordering::Relaxed);
        self.lines_appended.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn reopen(&self) -> Result<BufWriter<File>> {
        self.slots.reserve(self.id, self.this.clone());
        match OpenOptions::new().append(true).open(&self.path) {
            Ok(file) => Ok(BufWriter::with_capacity(
                BUCKET_WRITE_BUFFER_SIZE_KB * BYTES_PER_KB,
                file,
            )),
            Err(e) => {
                self.slots.release(self.id);
                Err(e).with_context(|| format!("Failed to reopen bucket {}", self.path.display()))
            }
        }
    }

    fn finish(&self, mut writer: BufWriter<File>) {
        if let Err(e) = writer.flush() {
            self.flush_failed.store(true, Ordering::Relaxed);
            warn!("⚠️ Failed to flush bucket {}: {}", self.path.display(), e);
        }
    }

    fn close(&self) -> BucketFile {
        let previous = std::mem::replace(&mut *self.state.lock(), WriterState::Closed);
        if let WriterState::Open(writer) = previous {
            self.slots.release(self.id);
            self.finish(writer);
        }
        BucketFile {
            id: self.id,
            path: self.path.clone(),
            lines: self.lines_appended(),
            complete: !self.flush_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    handles: HashMap<BucketId, Arc<BucketHandle>>,
    closed: Option<Vec<BucketFile>>,
}

/// Lazily creates one bucket file per identifier under a scratch directory and
/// hands the same handle to every caller asking for that identifier.
///
/// At most `max_open` bucket writers hold a file descriptor at any time.
pub struct BucketRegistry {
    scratch_dir: PathBuf,
    state: Mutex<RegistryState>,
    slots: Arc<WriterSlots>,
    created: AtomicUsize,
}

impl BucketRegistry {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self::with_max_open(scratch_dir, DEFAULT_MAX_OPEN_BUCKETS)
    }

    pub fn with_max_open(scratch_dir: impl Into<PathBuf>, max_open: usize) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            state: Mutex::new(RegistryState::default()),
            slots: Arc::new(WriterSlots::new(max_open)),
            created: AtomicUsize::new(0),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn bucket_path(&self, id: BucketId) -> PathBuf {
        self.scratch_dir.join(format!("{}{}", id, BUCKET_FILE_EXTENSION))
    }

    /// Number of bucket files this registry has created.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    /// Number of bucket writers currently holding a file descriptor.
    pub fn open_writers(&self) -> usize {
        self.slots.open_count()
    }

    pub fn get_or_create(&self, id: BucketId) -> Result<Arc<BucketHandle>> {
        let mut state = self.state.lock();
        if state.closed.is_some() {
            anyhow::bail!("Bucket registry is closed, cannot open bucket {}", id);
        }
        if let Some(handle) = state.handles.get(&id) {
            return Ok(Arc::clone(handle));
        }

        let handle = BucketHandle::create(id, self.bucket_path(id), Arc::clone(&self.slots))?;
        state.handles.insert(id, Arc::clone(&handle));
        self.created.fetch_add(1, Ordering::AcqRel);
        debug!("Created bucket {} at {}", id, handle.path().display());
        Ok(handle)
    }

    /// Flushes and closes every bucket once, returning them ordered by id.
    ///
    /// Must only be called once no writer is active. A bucket whose flush
    /// fails is returned with `complete == false`. Later calls return the
    /// same list without touching the files again.
    pub fn close_all(&self) -> Vec<BucketFile> {
        let mut state = self.state.lock();
        if let Some(closed) = &state.closed {
            return closed.clone();
        }

        let mut handles: Vec<&Arc<BucketHandle>> = state.handles.values().collect();
        handles.sort_by_key(|h| h.id());
        let files: Vec<BucketFile> = handles.into_iter().map(|h| h.close()).collect();

        let incomplete = files.iter().filter(|f| !f.complete).count();
        if incomplete > 0 {
            warn!("⚠️ {} of {} buckets were not fully flushed", incomplete, files.len());
        }
        debug!("Closed {} buckets", files.len());
        state.closed = Some(files.clone());
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::router::route;
    use std::thread;
    use tempfile::tempdir;

    const ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

    fn every_prefix_pair() -> Vec<String> {
        ALPHABET
            .chars()
            .flat_map(|a| ALPHABET.chars().map(move |b| format!("{}{}", a, b)))
            .collect()
    }

    fn bucket(raw: u16) -> BucketId {
        BucketId::new(raw).unwrap()
    }

    #[test]
    fn test_concurrent_get_or_create_creates_one_file() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::new(dir.path());
        let id = bucket(1234);

        let handles: Vec<Arc<BucketHandle>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| registry.get_or_create(id).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(registry.created_count(), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::new(dir.path());
        let id = bucket(7);

        thread::scope(|scope| {
            for worker in 0..8 {
                let registry = &registry;
                scope.spawn(move || {
                    for n in 0..250 {
                        let handle = registry.get_or_create(id).unwrap();
                        handle.append_line(&format!("w{}-line{}", worker, n)).unwrap();
                    }
                });
            }
        });

        let files = registry.close_all();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].lines, 2000);

        let content = std::fs::read_to_string(&files[0].path).unwrap();
        assert_eq!(content.lines().count(), 2000);
        assert!(content.lines().all(|l| l.starts_with('w') && l.contains("-line")));
    }

    #[test]
    fn test_close_all_is_idempotent_and_ordered() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::new(dir.path());
        for raw in [900, 3, 45] {
            registry.get_or_create(bucket(raw)).unwrap().append_line("x").unwrap();
        }

        let first = registry.close_all();
        let ids: Vec<u16> = first.iter().map(|f| f.id.get()).collect();
        assert_eq!(ids, vec![3, 45, 900]);
        assert_eq!(first[0].path, dir.path().join("3.txt"));

        let second = registry.close_all();
        assert_eq!(first, second);
    }

    #[test]
    fn test_closed_registry_rejects_new_work() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::new(dir.path());
        let handle = registry.get_or_create(bucket(1)).unwrap();
        registry.close_all();

        assert!(registry.get_or_create(bucket(2)).is_err());
        assert!(handle.append_line("late").is_err());
        assert_eq!(registry.created_count(), 1);
    }

    #[test]
    fn test_creation_error_propagates() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::new(dir.path().join("missing"));
        assert!(registry.get_or_create(bucket(1)).is_err());
        assert_eq!(registry.created_count(), 0);
    }

    #[test]
    fn test_open_writers_stay_under_cap() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::with_max_open(dir.path(), 8);
        let prefixes = every_prefix_pair();

        for round in 0..2 {
            for prefix in &prefixes {
                let handle = registry.get_or_create(route(prefix)).unwrap();
                handle.append_line(&format!("{}x{}", prefix, round)).unwrap();
                assert!(registry.open_writers() <= 8);
            }
        }

        let files = registry.close_all();
        assert_eq!(registry.created_count(), 1296);
        assert_eq!(files.len(), 1296);
        assert_eq!(registry.open_writers(), 0);
        assert!(files.iter().all(|f| f.lines == 2 && f.complete));

        let content = std::fs::read_to_string(registry.bucket_path(route("k7"))).unwrap();
        assert_eq!(content, "k7x0\nk7x1\n");
    }

    #[test]
    fn test_parked_writer_is_reopened_concurrently() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::with_max_open(dir.path(), 3);
        let prefixes = every_prefix_pair();

        thread::scope(|scope| {
            for worker in 0..4 {
                let registry = &registry;
                let prefixes = &prefixes;
                scope.spawn(move || {
                    for prefix in prefixes.iter().skip(worker * 7).take(300) {
                        let handle = registry.get_or_create(route(prefix)).unwrap();
                        handle.append_line(&format!("{}-{}", prefix, worker)).unwrap();
                    }
                });
            }
        });

        let files = registry.close_all();
        let total: usize = files.iter().map(|f| f.lines).sum();
        assert_eq!(total, 1200);
        let on_disk: usize = files
            .iter()
            .map(|f| std::fs::read_to_string(&f.path).unwrap().lines().count())
            .sum();
        assert_eq!(on_disk, 1200);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_flush_marks_bucket_incomplete() {
        let dir = tempdir().unwrap();
        let registry = BucketRegistry::new(dir.path());
        let id = route("fu");
        std::os::unix::fs::symlink("/dev/full", registry.bucket_path(id)).unwrap();

        registry.get_or_create(id).unwrap().append_line("full disk").unwrap();
        registry.get_or_create(route("ok")).unwrap().append_line("fine").unwrap();

        let files = registry.close_all();
        assert_eq!(files.len(), 2);
        let full = files.iter().find(|f| f.id == id).unwrap();
        assert!(!full.complete);
        assert_eq!(full.lines, 1);
        assert!(files.iter().find(|f| f.id == route("ok")).unwrap().complete);
    }
}
