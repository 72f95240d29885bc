//! File-backed store.
//!
//! # Layout
//! ```text
//! <path>                     snapshots + id of the current one (JSON, replaced atomically)
//! <path>.records.jsonl       one RequestRecord per line, append-only
//! ```
//!
//! # Design Decisions
//! - Reads are served from an in-memory [`MemoryStore`]
//! - Saves only enqueue; a dedicated writer thread does the file I/O, so
//!   callers holding the core state lock never wait on disk
//! - The writer coalesces queued snapshot saves into one rewrite
//! - A torn last line in the record log is skipped on load

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{CoordError, CoordResult};
use crate::store::{HealthSnapshot, HealthStore, MemoryStore, RequestRecord};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    snapshots: Vec<HealthSnapshot>,
    latest: Option<Uuid>,
}

#[derive(Debug)]
enum Pending {
    /// Snapshots changed; rewrite the snapshot file.
    Health,
    Record(RequestRecord),
}

/// Store persisted to a snapshot file plus a record log.
#[derive(Debug)]
pub struct FileStore {
    inner: Arc<MemoryStore>,
    tx: Option<mpsc::UnboundedSender<Pending>>,
    writer: Option<JoinHandle<()>>,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn store_err(path: &Path, err: impl std::fmt::Display) -> CoordError {
    CoordError::Store(format!("{}: {}", path.display(), err))
}

impl FileStore {
    /// Open the store, loading existing files, and start the writer thread.
    pub fn open(path: impl AsRef<Path>) -> CoordResult<Self> {
        let snapshot_path = path.as_ref().to_path_buf();
        let log_path = sibling(&snapshot_path, ".records.jsonl");
        let inner = Arc::new(MemoryStore::new());

        let snapshots = if snapshot_path.exists() {
            let file = File::open(&snapshot_path).map_err(|e| store_err(&snapshot_path, e))?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| store_err(&snapshot_path, e))?
        } else {
            SnapshotFile::default()
        };
        let (records, torn) = load_records(&log_path)?;
        tracing::info!(
            path = %snapshot_path.display(),
            snapshots = snapshots.snapshots.len(),
            records = records.len(),
            "Loaded store files"
        );
        inner.restore(snapshots.snapshots, snapshots.latest, records);

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| store_err(&log_path, e))?;
        let mut log = BufWriter::new(log);
        if torn {
            log.write_all(b"\n")
                .and_then(|_| log.flush())
                .map_err(|e| store_err(&log_path, e))?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = Writer {
            store: inner.clone(),
            snapshot_path,
            log_path: log_path.clone(),
            log,
        };
        let handle = std::thread::Builder::new()
            .name("pairwatch-store".into())
            .spawn(move || writer.run(rx))
            .map_err(|e| store_err(&log_path, e))?;

        Ok(Self {
            inner,
            tx: Some(tx),
            writer: Some(handle),
        })
    }

    fn enqueue(&self, write: Pending) -> CoordResult<()> {
        self.tx
            .as_ref()
            .and_then(|tx| tx.send(write).ok())
            .ok_or_else(|| CoordError::Store("store writer stopped".into()))
    }
}

/// Parse the record log, skipping lines that do not decode.
///
/// Also reports whether the log ends mid-line.
fn load_records(path: &Path) -> CoordResult<(Vec<RequestRecord>, bool)> {
    if !path.exists() {
        return Ok((Vec::new(), false));
    }
    let contents = fs::read_to_string(path).map_err(|e| store_err(path, e))?;
    let mut records = Vec::new();
    for (n, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(path = %path.display(), line = n + 1, error = %e, "Skipping unreadable record"),
        }
    }
    let torn = !contents.is_empty() && !contents.ends_with('\n');
    Ok((records, torn))
}

/// Write `contents` next to `path`, then rename over it.
fn replace_atomically(path: &Path, contents: &SnapshotFile) -> CoordResult<()> {
    let tmp = sibling(path, ".tmp");
    let file = File::create(&tmp).map_err(|e| store_err(&tmp, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, contents).map_err(|e| store_err(&tmp, e))?;
    out.flush().map_err(|e| store_err(&tmp, e))?;
    out.get_ref().sync_all().map_err(|e| store_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| store_err(path, e))
}

struct Writer {
    store: Arc<MemoryStore>,
    snapshot_path: PathBuf,
    log_path: PathBuf,
    log: BufWriter<File>,
}

impl Writer {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Pending>) {
        while let Some(first) = rx.blocking_recv() {
            let mut batch = vec![first];
            while let Ok(next) = rx.try_recv() {
                batch.push(next);
            }
            if let Err(e) = self.apply(batch) {
                tracing::error!(error = %e, "Store write failed");
            }
        }
        tracing::debug!("Store writer stopped");
    }

    fn apply(&mut self, batch: Vec<Pending>) -> CoordResult<()> {
        let mut health_dirty = false;
        for write in batch {
            match write {
                Pending::Health => health_dirty = true,
                Pending::Record(record) => {
                    serde_json::to_writer(&mut self.log, &record).map_err(|e| store_err(&self.log_path, e))?;
                    self.log.write_all(b"\n").map_err(|e| store_err(&self.log_path, e))?;
                }
            }
        }
        self.log.flush().map_err(|e| store_err(&self.log_path, e))?;

        if health_dirty {
            let (snapshots, latest) = self.store.dump();
            replace_atomically(&self.snapshot_path, &SnapshotFile { snapshots, latest })?;
        }
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain and exit.
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::error!("Store writer panicked");
            }
        }
    }
}

impl HealthStore for FileStore {
    fn load_latest_health(&self) -> CoordResult<Option<HealthSnapshot>> {
        self.inner.load_latest_health()
    }

    fn save_health(&self, snapshot: &HealthSnapshot) -> CoordResult<()> {
        self.inner.save_health(snapshot)?;
        self.enqueue(Pending::Health)
    }

    fn save_record(&self, record: &RequestRecord) -> CoordResult<()> {
        self.inner.save_record(record)?;
        self.enqueue(Pending::Record(record.clone()))
    }

    fn record_count(&self) -> usize {
        self.inner.record_count()
    }
}
