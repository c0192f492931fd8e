//! Per-family worker pools.
//!
//! Jobs are partitioned by backend family into two queues before any
//! worker starts. Each worker pops from its family's queue until it is
//! empty or the abort flag is set; a job that has been popped always runs
//! to completion. [`Executor::run`] returns only after every started job
//! has finished.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::config::{BackendKind, PipelineConfig};

use super::progress::ProgressEvent;

/// Result of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Rendered and stored as-is.
    Rendered,
    /// Rendered, then re-encoded once to pass validation.
    Repaired,
    /// Failed; nothing was stored.
    Failed(String),
}

impl TaskOutcome {
    /// Returns the string representation of the outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Rendered => "rendered",
            TaskOutcome::Repaired => "repaired",
            TaskOutcome::Failed(_) => "failed",
        }
    }
}

/// A unit of work bound to one backend family.
#[derive(Debug, Clone)]
pub struct Job<T> {
    /// Pool the job runs in.
    pub family: BackendKind,
    /// Short label for progress lines.
    pub label: String,
    /// Work item handed to the job function.
    pub payload: T,
}

/// What [`Executor::run`] did.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSummary {
    /// Label and outcome of every job that ran, in completion order.
    pub outcomes: Vec<(String, TaskOutcome)>,
    /// Jobs never started because of an abort.
    pub skipped: usize,
}

impl ExecutionSummary {
    /// Counts outcomes matching a predicate.
    pub fn count(&self, f: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| f(o)).count()
    }
}

/// Two fixed-size worker pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    local_workers: usize,
    remote_workers: usize,
}

impl Executor {
    /// Creates an executor; zero sizes are raised to one.
    pub fn new(local_workers: usize, remote_workers: usize) -> Self {
        Self {
            local_workers: local_workers.max(1),
            remote_workers: remote_workers.max(1),
        }
    }

    /// Sizes the pools from the config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.effective_local_workers(), config.remote.workers)
    }

    /// Returns the worker count of a family.
    pub fn workers(&self, family: BackendKind) -> usize {
        match family {
            BackendKind::Local => self.local_workers,
            BackendKind::Remote => self.remote_workers,
        }
    }

    /// Runs every job through its family's pool and blocks until done.
    ///
    /// `abort` is checked before each job is taken; jobs left in the queues
    /// at that point are counted as skipped. Progress is sent on `events`.
    pub fn run<T, F>(
        &self,
        jobs: Vec<Job<T>>,
        abort: &AtomicBool,
        events: &Sender<ProgressEvent>,
        work: F,
    ) -> ExecutionSummary
    where
        T: Send,
        F: Fn(&T) -> TaskOutcome + Sync,
    {
        let total = jobs.len();
        let (local, remote): (VecDeque<_>, VecDeque<_>) =
            jobs.into_iter().partition(|j| j.family == BackendKind::Local);
        debug!("Executing {} local and {} remote jobs", local.len(), remote.len());

        let _ = events.send(ProgressEvent::Started { total });

        let queues = [
            (BackendKind::Local, Mutex::new(local)),
            (BackendKind::Remote, Mutex::new(remote)),
        ];
        let outcomes = Mutex::new(Vec::with_capacity(total));

        std::thread::scope(|scope| {
            for (family, queue) in &queues {
                let pending = queue.lock().unwrap_or_else(PoisonError::into_inner).len();
                let workers = self.workers(*family).min(pending);
                for _ in 0..workers {
                    let events = events.clone();
                    let work = &work;
                    let outcomes = &outcomes;
                    scope.spawn(move || loop {
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        let next = queue
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .pop_front();
                        let Some(job) = next else {
                            break;
                        };

                        let outcome = work(&job.payload);
                        let _ = events.send(ProgressEvent::Finished {
                            family: job.family,
                            label: job.label.clone(),
                            outcome: outcome.clone(),
                        });
                        outcomes
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((job.label, outcome));
                    });
                }
            }
        });

        let skipped: usize = queues
            .iter()
            .map(|(_, q)| q.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum();
        if skipped > 0 {
            let _ = events.send(ProgressEvent::Aborted { skipped });
        }

        ExecutionSummary {
            outcomes: outcomes.into_inner().unwrap_or_else(PoisonError::into_inner),
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    fn jobs(n: usize, family: BackendKind) -> Vec<Job<usize>> {
        (0..n)
            .map(|i| Job {
                family,
                label: format!("{}-{}", family, i),
                payload: i,
            })
            .collect()
    }

    #[test]
    fn every_job_runs_once() {
        let (tx, rx) = mpsc::channel();
        let executor = Executor::new(3, 2);
        let mut all = jobs(10, BackendKind::Local);
        all.extend(jobs(5, BackendKind::Remote));

        let summary = executor.run(all, &AtomicBool::new(false), &tx, |i| {
            if *i == 7 {
                TaskOutcome::Failed("seven".to_string())
            } else {
                TaskOutcome::Rendered
            }
        });
        drop(tx);

        assert_eq!(summary.outcomes.len(), 15);
        assert_eq!(summary.skipped, 0);
        // Payload 7 exists only in the local batch.
        assert_eq!(summary.count(|o| matches!(o, TaskOutcome::Failed(_))), 1);

        let events: Vec<_> = rx.iter().collect();
        assert!(matches!(events[0], ProgressEvent::Started { total: 15 }));
        assert_eq!(events.len(), 16);
    }

    #[test]
    fn pool_sizes_bound_concurrency() {
        let (tx, _rx) = mpsc::channel();
        let executor = Executor::new(4, 2);
        let running = AtomicUsize::new(0);
        let peak_remote = AtomicUsize::new(0);

        executor.run(jobs(12, BackendKind::Remote), &AtomicBool::new(false), &tx, |_| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak_remote.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            running.fetch_sub(1, Ordering::SeqCst);
            TaskOutcome::Rendered
        });

        assert!(peak_remote.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn abort_stops_submission_but_finishes_in_flight() {
        let (tx, _rx) = mpsc::channel();
        let executor = Executor::new(1, 1);
        let abort = AtomicBool::new(false);

        let summary = executor.run(jobs(10, BackendKind::Local), &abort, &tx, |i| {
            if *i == 2 {
                abort.store(true, Ordering::SeqCst);
            }
            TaskOutcome::Rendered
        });

        // Jobs 0, 1 and 2 ran (2 to completion after raising the flag).
        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.skipped, 7);
    }

    #[test]
    fn empty_batch() {
        let (tx, _rx) = mpsc::channel();
        let summary = Executor::new(2, 2).run(Vec::<Job<()>>::new(), &AtomicBool::new(false), &tx, |_| {
            TaskOutcome::Rendered
        });
        assert!(summary.outcomes.is_empty());
        assert_eq!(summary.skipped, 0);
    }
}
