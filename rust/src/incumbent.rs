//! Incumbent tracking, improvement notification and cooperative cancellation.
//!
//! The tracker is shared by reference with every search thread. The best key
//! lives in an atomic so the hot path can compare bounds without locking; the
//! incumbent itself is replaced under a mutex, and only when strictly better.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::SolverConfig;
use crate::log_improvement;
use crate::models::{Assignment, StopReason};
use crate::objective::variance_from_key;

/// Cloneable cancellation handle. Cancelling any clone cancels them all.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Best complete feasible assignment known so far.
#[derive(Clone, Debug, PartialEq)]
pub struct Incumbent {
    pub assignment: Assignment,
    /// Sum of squared shift counts.
    pub key: u64,
    /// Sample variance of shift counts.
    pub objective: f64,
}

/// Notification payload for a stored improvement.
#[derive(Clone, Debug)]
pub struct Improvement {
    pub assignment: Assignment,
    pub objective: f64,
    /// 1 for the first incumbent, incremented per improvement.
    pub sequence: u64,
    /// Time since the solve started.
    pub elapsed: Duration,
}

/// Receives every incumbent improvement.
///
/// Called on the search thread that found the improvement, after the
/// incumbent lock is released. Implementations must return promptly.
pub trait ImprovementObserver: Send + Sync {
    fn on_improvement(&self, improvement: &Improvement);
}

impl<F> ImprovementObserver for F
where
    F: Fn(&Improvement) + Send + Sync,
{
    fn on_improvement(&self, improvement: &Improvement) {
        self(improvement)
    }
}

/// Observer that forwards improvements into a channel without blocking.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<Improvement>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<Improvement>) -> Self {
        Self { tx }
    }
}

impl ImprovementObserver for ChannelObserver {
    fn on_improvement(&self, improvement: &Improvement) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(improvement.clone());
    }
}

const NO_INCUMBENT: u64 = u64::MAX;

const LIMIT_NONE: u8 = 0;
const LIMIT_TIME: u8 = 1;
const LIMIT_NODES: u8 = 2;

/// Nodes between wall-clock checks.
const CLOCK_CHECK_INTERVAL: u64 = 64;

/// Owns the incumbent for one solve and arbitrates when the search stops.
pub struct IncumbentTracker<'o> {
    best: Mutex<Option<Incumbent>>,
    best_key: AtomicU64,
    improvements: AtomicU64,
    nodes: AtomicU64,
    limit_hit: AtomicU8,
    observer: Option<&'o dyn ImprovementObserver>,
    cancel: CancellationToken,
    started: Instant,
    time_limit: Option<Duration>,
    node_limit: Option<u64>,
    person_count: usize,
    horizon_len: usize,
    verbosity: u8,
}

impl<'o> IncumbentTracker<'o> {
    pub fn new(
        person_count: usize,
        horizon_len: usize,
        config: &SolverConfig,
        observer: Option<&'o dyn ImprovementObserver>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            best: Mutex::new(None),
            best_key: AtomicU64::new(NO_INCUMBENT),
            improvements: AtomicU64::new(0),
            nodes: AtomicU64::new(0),
            limit_hit: AtomicU8::new(LIMIT_NONE),
            observer,
            cancel,
            started: Instant::now(),
            time_limit: config.time_limit,
            node_limit: config.node_limit,
            person_count,
            horizon_len,
            verbosity: config.verbosity,
        }
    }

    /// Key of the current incumbent, without locking.
    #[inline]
    pub fn best_key(&self) -> Option<u64> {
        match self.best_key.load(Ordering::Acquire) {
            NO_INCUMBENT => None,
            key => Some(key),
        }
    }

    /// Whether a candidate with `key` would replace the incumbent right now.
    #[inline]
    pub fn improves(&self, key: u64) -> bool {
        key < self.best_key.load(Ordering::Acquire)
    }

    /// Offer a complete feasible assignment whose sum of squares is `key`.
    ///
    /// Stores it and notifies the observer when there is no incumbent or the
    /// key is strictly lower. Returns whether it was stored.
    pub fn report_candidate(&self, assignment: &Assignment, key: u64) -> bool {
        if !self.improves(key) {
            return false;
        }

        let objective = variance_from_key(key, self.horizon_len as u64, self.person_count);
        let improvement = {
            let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
            if best.as_ref().is_some_and(|inc| key >= inc.key) {
                return false;
            }
            *best = Some(Incumbent {
                assignment: assignment.clone(),
                key,
                objective,
            });
            self.best_key.store(key, Ordering::Release);
            let sequence = self.improvements.fetch_add(1, Ordering::AcqRel) + 1;
            Improvement {
                assignment: assignment.clone(),
                objective,
                sequence,
                elapsed: self.started.elapsed(),
            }
        };

        log_improvement!(
            self.verbosity,
            "Incumbent #{}: variance {:.4} (sum of squares {}) after {:?}",
            improvement.sequence,
            objective,
            key,
            improvement.elapsed
        );

        if let Some(observer) = self.observer {
            observer.on_improvement(&improvement);
        }
        true
    }

    /// Snapshot of the current incumbent.
    pub fn best_so_far(&self) -> Option<Incumbent> {
        self.best
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop check performed once per day decision. Counts the node and
    /// returns true when the search must unwind.
    #[inline]
    pub fn checkpoint(&self) -> bool {
        let nodes = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        if self.should_stop() {
            return true;
        }
        if self.node_limit.is_some_and(|limit| nodes > limit) {
            self.hit_limit(LIMIT_NODES);
            return true;
        }
        if nodes % CLOCK_CHECK_INTERVAL == 0 || nodes == 1 {
            if let Some(limit) = self.time_limit {
                if self.started.elapsed() >= limit {
                    self.hit_limit(LIMIT_TIME);
                    return true;
                }
            }
        }
        false
    }

    /// Whether cancellation was requested or a limit was hit.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.limit_hit.load(Ordering::Acquire) != LIMIT_NONE
    }

    /// Record a limit for this solve. The caller's token is left alone;
    /// `should_stop` covers both.
    fn hit_limit(&self, limit: u8) {
        // First limit wins.
        let _ = self.limit_hit.compare_exchange(
            LIMIT_NONE,
            limit,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn stop_reason(&self) -> StopReason {
        match self.limit_hit.load(Ordering::Acquire) {
            LIMIT_TIME => StopReason::TimeLimit,
            LIMIT_NODES => StopReason::NodeLimit,
            _ if self.cancel.is_cancelled() => StopReason::Cancelled,
            _ => StopReason::Exhausted,
        }
    }

    pub fn improvements(&self) -> u64 {
        self.improvements.load(Ordering::Acquire)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
