//! Timer-driven refresh loops for the live console.
//!
//! A poll driver runs on the tokio runtime, fetches its target at a fixed
//! cadence and hands every result to a `PollJob::deliver` sink. The UI side
//! keeps a [`PollTracker`] per target; results are tagged with the generation
//! they were issued under so a late answer for an old target is dropped.

use std::time::Duration;

use async_trait::async_trait;
use tokio::{runtime::Handle, sync::watch};

use crate::domain::failure::SourceError;

const POLL_STARTED: &str = "POLL_STARTED";
const POLL_STOPPED: &str = "POLL_STOPPED";
const POLL_FETCH_FAILED: &str = "POLL_FETCH_FAILED";
const POLL_SESSION_EXPIRED: &str = "POLL_SESSION_EXPIRED";
const POLL_RECEIVER_GONE: &str = "POLL_RECEIVER_GONE";

/// Longest shift applied to the interval; keeps the multiplication in range.
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Fetching,
    Settled,
    Failed,
}

/// UI-side bookkeeping of one poll target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTracker {
    generation: u64,
    phase: PollPhase,
    consecutive_failures: u32,
}

impl Default for PollTracker {
    fn default() -> Self {
        Self {
            generation: 0,
            phase: PollPhase::Idle,
            consecutive_failures: 0,
        }
    }
}

impl PollTracker {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Starts a new generation. `active == false` means the target is gone.
    pub fn retarget(&mut self, active: bool) -> u64 {
        self.generation += 1;
        self.consecutive_failures = 0;
        self.phase = if active {
            PollPhase::Fetching
        } else {
            PollPhase::Idle
        };
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.phase != PollPhase::Idle && self.generation == generation
    }

    /// Records a result. Returns `false` when it belongs to an older
    /// generation and must be discarded.
    pub fn settle(&mut self, generation: u64, ok: bool) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        if ok {
            self.phase = PollPhase::Settled;
            self.consecutive_failures = 0;
        } else {
            self.phase = PollPhase::Failed;
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
        true
    }

    pub fn stop(&mut self) {
        self.retarget(false);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub interval: Duration,
    pub max_backoff: Duration,
}

impl BackoffPolicy {
    pub fn new(interval: Duration, max_backoff: Duration) -> Self {
        Self {
            interval,
            max_backoff: max_backoff.max(interval),
        }
    }

    /// Delay before the next fetch: `interval * 2^failures`, capped.
    pub fn delay_after(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.min(MAX_BACKOFF_EXPONENT);
        self.interval
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// One polling target: how to fetch it and where results go.
#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    type Output: Send + 'static;

    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Self::Output, SourceError>;

    /// Returns `false` once nobody listens anymore; the driver then stops.
    fn deliver(&self, result: Result<Self::Output, SourceError>) -> bool;
}

/// Owns a running poll driver. Dropping the handle stops it.
#[derive(Debug)]
pub struct PollHandle {
    name: &'static str,
    stop_tx: Option<watch::Sender<bool>>,
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::debug!(poller = self.name, "poll driver stop signal sent");
        }
    }
}

pub fn start_poll<J: PollJob>(runtime: &Handle, job: J, policy: BackoffPolicy) -> PollHandle {
    let name = job.name();
    let (stop_tx, stop_rx) = watch::channel(false);
    runtime.spawn(run_poll(job, policy, stop_rx));

    tracing::debug!(
        code = POLL_STARTED,
        poller = name,
        interval = ?policy.interval,
        "poll driver started"
    );

    PollHandle {
        name,
        stop_tx: Some(stop_tx),
    }
}

async fn run_poll<J: PollJob>(job: J, policy: BackoffPolicy, mut stop_rx: watch::Receiver<bool>) {
    let mut failures = 0u32;

    loop {
        let result = tokio::select! {
            _ = stop_requested(&mut stop_rx) => break,
            result = job.fetch() => result,
        };

        let session_expired = matches!(&result, Err(error) if error.is_unauthorized());
        match &result {
            Ok(_) => failures = 0,
            Err(error) => {
                failures = failures.saturating_add(1);
                tracing::warn!(
                    code = POLL_FETCH_FAILED,
                    poller = job.name(),
                    failures,
                    error_code = error.code(),
                    error = %error,
                    "poll fetch failed"
                );
            }
        }

        if !job.deliver(result) {
            tracing::debug!(code = POLL_RECEIVER_GONE, poller = job.name(), "poll receiver gone");
            break;
        }

        if session_expired {
            tracing::warn!(
                code = POLL_SESSION_EXPIRED,
                poller = job.name(),
                "session rejected by backend; poll driver stops"
            );
            break;
        }

        tokio::select! {
            _ = stop_requested(&mut stop_rx) => break,
            _ = tokio::time::sleep(policy.delay_after(failures)) => {}
        }
    }

    tracing::debug!(code = POLL_STOPPED, poller = job.name(), "poll driver stopped");
}

/// Resolves once a stop was sent or the handle is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            return;
        }
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}
