//! Bounded worker pool for hash jobs.
//!
//! A fixed set of worker threads consumes jobs from a bounded channel and
//! publishes outcomes on an unbounded one. Submission blocks once the job
//! channel is full, which is the pipeline's backpressure: the coordinator
//! can never race ahead of the workers by more than the channel capacity.
//!
//! Results arrive in arbitrary order; the coordinator partitions them by
//! digest, so reordering within a stage is harmless. Cancellation is a
//! shared atomic flag checked at job boundaries: once set, `submit`
//! refuses new jobs and queued jobs drain without touching the disk.
//! Dropping the pool closes the job channel and joins every worker, so no
//! file handle or thread outlives a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::progress::{ProgressEvent, ProgressSink, ScanPhase};
use crate::scanner::{FileEntry, Hash, HashError, Hasher};

/// Which digest a job computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Hash the first prehash-window bytes.
    Prehash,
    /// Hash the entire content.
    Full,
}

/// One unit of hashing work.
#[derive(Debug)]
pub struct HashJob {
    /// The file to hash
    pub entry: FileEntry,
    /// Which digest to compute
    pub kind: JobKind,
}

/// The completed result of a [`HashJob`].
#[derive(Debug)]
pub struct JobOutcome {
    /// The file that was hashed
    pub entry: FileEntry,
    /// Which digest was computed
    pub kind: JobKind,
    /// The digest, or the warning that removed the file from the stage
    pub result: Result<Hash, HashError>,
}

/// The pool stopped accepting jobs (cancelled or shut down).
#[derive(thiserror::Error, Debug)]
#[error("hash pool is no longer accepting jobs")]
pub struct PoolClosed;

#[derive(Debug)]
struct StageState {
    phase: ScanPhase,
    done: u64,
    total: u64,
}

/// Bounded pool of hash workers.
pub struct HashPool {
    job_tx: Option<Sender<HashJob>>,
    results_rx: Receiver<JobOutcome>,
    handles: Vec<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    stage: Arc<Mutex<StageState>>,
}

impl HashPool {
    /// Spawn `workers` threads computing digests with the given hasher.
    ///
    /// The pool owns its threads until it is dropped. Every completed job
    /// emits one `StageProgress` event on `sink`, tagged with the phase
    /// set by [`begin_stage`](Self::begin_stage).
    #[must_use]
    pub fn new(
        workers: usize,
        hasher: Hasher,
        cancel: Arc<AtomicBool>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = bounded::<HashJob>(workers);
        let (result_tx, results_rx) = unbounded::<JobOutcome>();
        let stage = Arc::new(Mutex::new(StageState {
            phase: ScanPhase::Prehash,
            done: 0,
            total: 0,
        }));

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = Arc::clone(&cancel);
            let sink = Arc::clone(&sink);
            let stage = Arc::clone(&stage);

            let handle = std::thread::Builder::new()
                .name(format!("hash-worker-{i}"))
                .spawn(move || {
                    for job in job_rx.iter() {
                        let result = if cancel.load(Ordering::SeqCst) {
                            // Drain without reading; the coordinator
                            // discards the stage anyway.
                            Err(HashError::Io {
                                path: job.entry.path.clone(),
                                source: std::io::Error::new(
                                    std::io::ErrorKind::Interrupted,
                                    "scan cancelled",
                                ),
                            })
                        } else {
                            match job.kind {
                                JobKind::Prehash => hasher.prehash(&job.entry.path),
                                JobKind::Full => hasher.full_hash(&job.entry.path),
                            }
                        };

                        let (phase, done, total) = {
                            let mut s = stage.lock().unwrap();
                            s.done += 1;
                            (s.phase, s.done, s.total)
                        };
                        sink.on_event(ProgressEvent::StageProgress { phase, done, total });

                        let outcome = JobOutcome {
                            entry: job.entry,
                            kind: job.kind,
                            result,
                        };
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
                .expect("failed to spawn hash worker");
            handles.push(handle);
        }

        Self {
            job_tx: Some(job_tx),
            results_rx,
            handles,
            cancel,
            stage,
        }
    }

    /// Reset the progress counters for a new stage.
    ///
    /// Must only be called after every outcome of the previous stage has
    /// been received.
    pub fn begin_stage(&self, phase: ScanPhase, total: u64) {
        let mut s = self.stage.lock().unwrap();
        s.phase = phase;
        s.done = 0;
        s.total = total;
    }

    /// Submit one job, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PoolClosed`] once cancellation has been requested.
    pub fn submit(&self, job: HashJob) -> Result<(), PoolClosed> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(PoolClosed);
        }
        let tx = self.job_tx.as_ref().ok_or(PoolClosed)?;
        tx.send(job).map_err(|_| PoolClosed)
    }

    /// Receive the next completed outcome, blocking until one arrives.
    ///
    /// # Errors
    ///
    /// Returns [`PoolClosed`] if every worker has exited.
    pub fn recv(&self) -> Result<JobOutcome, PoolClosed> {
        self.results_rx.recv().map_err(|_| PoolClosed)
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl Drop for HashPool {
    fn drop(&mut self) {
        // Closing the job channel lets every worker fall out of its loop.
        self.job_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
