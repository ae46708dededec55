// src/pipeline.rs
//! Fixed-size worker pool that resolves a batch of value jobs
//!
//! Each job is resolved by reusing its existing output when the caller's
//! equivalence check says it still matches the desired input, or by
//! running the transform otherwise. The resolved output is handed to the
//! caller's commit hook.
//!
//! Jobs travel from a single dispatcher thread to the workers over an
//! unbuffered channel; every job a worker receives produces exactly one
//! signal on the result channel. The calling thread drains signals until
//! the result channel closes, so every worker and the dispatcher have
//! exited by the time [`Pipeline::run`] returns, error or not. After the
//! first failure the dispatcher stops handing out jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::config::PipelineSettings;
use crate::error::{CoreError, ProviderError, Result};
use crate::provider::CryptoProvider;

/// Shared flag that stops dispatch and job resolution when set
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One path's worth of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueJob<O, I> {
    /// Identifies the value for commit and error reporting
    pub path: String,
    /// Output produced by an earlier run, if any
    pub existing: Option<O>,
    pub desired: I,
}

impl<O, I> ValueJob<O, I> {
    pub fn new(path: impl Into<String>, existing: Option<O>, desired: I) -> Self {
        Self {
            path: path.into(),
            existing,
            desired,
        }
    }
}

/// Result of decrypting one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedValue {
    pub plaintext: String,
    /// Whether the host should mark the value as a decrypted secret
    pub tagged: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub dispatched: usize,
    pub reused: usize,
    pub transformed: usize,
}

enum Outcome {
    Reused,
    Transformed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    workers: usize,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(CoreError::Config(
                "pipeline needs at least one worker".into(),
            ));
        }
        Ok(Self {
            workers,
            cancel: CancelToken::new(),
        })
    }

    pub fn from_settings(settings: &PipelineSettings) -> Result<Self> {
        Self::new(settings.workers)
    }

    /// Stop batches run by this pipeline when `token` is cancelled
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Resolve every job on the worker pool.
    ///
    /// Returns the first job error (as [`CoreError::Transform`]) once all
    /// outstanding signals are drained. Commits made before the failure
    /// stay in place. Returns [`CoreError::Cancelled`] if the cancel token
    /// stopped the batch before every job resolved.
    pub fn run<O, I, E, T, C>(
        &self,
        jobs: impl IntoIterator<Item = ValueJob<O, I>>,
        equivalent: E,
        transform: T,
        commit: C,
    ) -> Result<BatchReport>
    where
        O: Send,
        I: Send,
        E: Fn(&O, &I) -> bool + Sync,
        T: Fn(&I) -> std::result::Result<O, ProviderError> + Sync,
        C: Fn(&str, O) + Sync,
    {
        let jobs: Vec<ValueJob<O, I>> = jobs.into_iter().collect();
        let total = jobs.len();
        if total == 0 {
            return Ok(BatchReport::default());
        }

        debug!(jobs = total, workers = self.workers, "starting batch");

        let failed = AtomicBool::new(false);
        let halted = || failed.load(Ordering::SeqCst) || self.cancel.is_cancelled();

        let (job_tx, job_rx) = bounded::<ValueJob<O, I>>(0);
        let (result_tx, result_rx) = bounded::<Result<Outcome>>(0);

        let mut report = BatchReport::default();
        let mut skipped = 0usize;
        let mut first_error = None;

        thread::scope(|s| {
            for _ in 0..self.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let (equivalent, transform, commit, halted) =
                    (&equivalent, &transform, &commit, &halted);
                s.spawn(move || {
                    worker_loop(job_rx, result_tx, equivalent, transform, commit, halted)
                });
            }
            // Only workers hold these now, so the channels close when they exit
            drop(job_rx);
            drop(result_tx);

            let halted = &halted;
            s.spawn(move || dispatch(jobs, job_tx, halted));

            for signal in result_rx.iter() {
                report.dispatched += 1;
                match signal {
                    Ok(Outcome::Reused) => report.reused += 1,
                    Ok(Outcome::Transformed) => report.transformed += 1,
                    Ok(Outcome::Skipped) => skipped += 1,
                    Err(e) => {
                        failed.store(true, Ordering::SeqCst);
                        if first_error.is_none() {
                            warn!("batch aborting: {e}");
                            first_error = Some(e);
                        } else {
                            debug!("further job failure while draining: {e}");
                        }
                    }
                }
            }
        });

        if let Some(e) = first_error {
            return Err(e);
        }
        if skipped > 0 || report.dispatched < total {
            debug!(
                dispatched = report.dispatched,
                skipped,
                total,
                "batch cancelled"
            );
            return Err(CoreError::Cancelled);
        }

        debug!(
            reused = report.reused,
            transformed = report.transformed,
            "batch resolved"
        );
        Ok(report)
    }

    /// Encrypt plaintext values, reusing existing ciphertexts that still match
    pub fn encrypt_values<P, E, C>(
        &self,
        provider: &P,
        jobs: impl IntoIterator<Item = ValueJob<Vec<u8>, String>>,
        equivalent: E,
        commit: C,
    ) -> Result<BatchReport>
    where
        P: CryptoProvider + ?Sized,
        E: Fn(&Vec<u8>, &String) -> bool + Sync,
        C: Fn(&str, Vec<u8>) + Sync,
    {
        self.run(
            jobs,
            equivalent,
            |plaintext: &String| provider.encrypt(plaintext),
            commit,
        )
    }

    /// Decrypt ciphertext values, reusing existing plaintexts that still match
    pub fn decrypt_values<P, E, C>(
        &self,
        provider: &P,
        jobs: impl IntoIterator<Item = ValueJob<DecryptedValue, Vec<u8>>>,
        tag_output: bool,
        equivalent: E,
        commit: C,
    ) -> Result<BatchReport>
    where
        P: CryptoProvider + ?Sized,
        E: Fn(&DecryptedValue, &Vec<u8>) -> bool + Sync,
        C: Fn(&str, DecryptedValue) + Sync,
    {
        self.run(
            jobs,
            equivalent,
            |ciphertext: &Vec<u8>| {
                provider.decrypt(ciphertext).map(|plaintext| DecryptedValue {
                    plaintext,
                    tagged: tag_output,
                })
            },
            commit,
        )
    }
}

fn dispatch<O, I, H>(jobs: Vec<ValueJob<O, I>>, job_tx: Sender<ValueJob<O, I>>, halted: &H)
where
    H: Fn() -> bool,
{
    for job in jobs {
        if halted() || job_tx.send(job).is_err() {
            break;
        }
    }
    // job_tx drops here and idle workers exit once the channel drains
}

fn worker_loop<O, I, E, T, C, H>(
    job_rx: Receiver<ValueJob<O, I>>,
    result_tx: Sender<Result<Outcome>>,
    equivalent: &E,
    transform: &T,
    commit: &C,
    halted: &H,
) where
    E: Fn(&O, &I) -> bool,
    T: Fn(&I) -> std::result::Result<O, ProviderError>,
    C: Fn(&str, O),
    H: Fn() -> bool,
{
    for job in job_rx.iter() {
        let signal = if halted() {
            Ok(Outcome::Skipped)
        } else {
            resolve(job, equivalent, transform, commit)
        };
        if result_tx.send(signal).is_err() {
            break;
        }
    }
}

fn resolve<O, I, E, T, C>(
    job: ValueJob<O, I>,
    equivalent: &E,
    transform: &T,
    commit: &C,
) -> Result<Outcome>
where
    E: Fn(&O, &I) -> bool,
    T: Fn(&I) -> std::result::Result<O, ProviderError>,
    C: Fn(&str, O),
{
    let ValueJob {
        path,
        existing,
        desired,
    } = job;

    match existing {
        Some(existing) if equivalent(&existing, &desired) => {
            commit(&path, existing);
            Ok(Outcome::Reused)
        }
        _ => {
            let output = transform(&desired).map_err(|source| CoreError::Transform {
                path: path.clone(),
                source,
            })?;
            commit(&path, output);
            Ok(Outcome::Transformed)
        }
    }
}
