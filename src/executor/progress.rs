//! Progress aggregation.
//!
//! Workers send [`ProgressEvent`]s over a channel; a single reporter thread
//! owns the counters and is the only writer of per-task progress lines.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::BackendKind;

use super::pool::TaskOutcome;

/// Message from the executor to the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A batch of `total` jobs was submitted.
    Started { total: usize },
    /// One job finished.
    Finished {
        family: BackendKind,
        label: String,
        outcome: TaskOutcome,
    },
    /// The batch was aborted with `skipped` jobs never started.
    Aborted { skipped: usize },
}

/// Counters accumulated by the reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressTally {
    /// Jobs submitted across all batches.
    pub total: usize,
    /// Jobs stored as rendered.
    pub rendered: usize,
    /// Jobs stored after a re-encode.
    pub repaired: usize,
    /// Jobs that failed.
    pub failed: usize,
    /// Jobs never started.
    pub skipped: usize,
    /// Label and reason of every failure.
    pub failures: Vec<(String, String)>,
}

impl ProgressTally {
    /// Jobs finished so far.
    pub fn completed(&self) -> usize {
        self.rendered + self.repaired + self.failed
    }

    /// Applies one event.
    pub fn record(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => self.total += total,
            ProgressEvent::Finished { label, outcome, .. } => match outcome {
                TaskOutcome::Rendered => self.rendered += 1,
                TaskOutcome::Repaired => self.repaired += 1,
                TaskOutcome::Failed(reason) => {
                    self.failed += 1;
                    self.failures.push((label.clone(), reason.clone()));
                }
            },
            ProgressEvent::Aborted { skipped } => self.skipped += skipped,
        }
    }
}

/// Handle to the reporter thread.
pub struct ProgressReporter {
    handle: JoinHandle<ProgressTally>,
}

impl ProgressReporter {
    /// Starts the reporter and returns the producer side of its channel.
    pub fn spawn() -> (Sender<ProgressEvent>, Self) {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || Self::report_loop(receiver));
        (sender, Self { handle })
    }

    /// Waits for every sender to drop and returns the final counts.
    pub fn finish(self) -> ProgressTally {
        self.handle.join().unwrap_or_default()
    }

    fn report_loop(receiver: Receiver<ProgressEvent>) -> ProgressTally {
        let mut tally = ProgressTally::default();
        let mut started = Instant::now();

        for event in receiver {
            if let ProgressEvent::Started { total } = event {
                if tally.total == 0 {
                    started = Instant::now();
                }
                if total > 0 {
                    info!("Rendering {} tasks", total);
                }
            }

            tally.record(&event);

            match &event {
                ProgressEvent::Finished {
                    family,
                    label,
                    outcome,
                } => {
                    let done = tally.completed();
                    let eta = eta(started.elapsed(), done, tally.total);
                    match outcome {
                        TaskOutcome::Failed(reason) => warn!(
                            "[{}/{}] {} failed via {}: {} (eta {})",
                            done, tally.total, label, family, reason, format_duration(eta)
                        ),
                        ok => info!(
                            "[{}/{}] {} {} via {} (eta {})",
                            done,
                            tally.total,
                            label,
                            ok.as_str(),
                            family,
                            format_duration(eta)
                        ),
                    }
                }
                ProgressEvent::Aborted { skipped } => {
                    warn!("Interrupted: {} tasks not started", skipped)
                }
                ProgressEvent::Started { .. } => {}
            }
        }

        tally
    }
}

/// Estimates remaining time from the average so far.
pub fn eta(elapsed: Duration, done: usize, total: usize) -> Duration {
    if done == 0 || done >= total {
        return Duration::ZERO;
    }
    elapsed.mul_f64((total - done) as f64 / done as f64)
}

/// Formats a duration as `M:SS`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_scales_with_remaining_work() {
        assert_eq!(eta(Duration::from_secs(10), 0, 10), Duration::ZERO);
        assert_eq!(eta(Duration::from_secs(10), 5, 10), Duration::from_secs(10));
        assert_eq!(eta(Duration::from_secs(10), 2, 10), Duration::from_secs(40));
        assert_eq!(eta(Duration::from_secs(10), 10, 10), Duration::ZERO);
    }

    #[test]
    fn duration_format() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(75)), "1:15");
        assert_eq!(format_duration(Duration::from_secs(3600)), "60:00");
    }

    #[test]
    fn reporter_tallies_events_from_many_producers() {
        let (tx, reporter) = ProgressReporter::spawn();
        tx.send(ProgressEvent::Started { total: 40 }).unwrap();

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..10 {
                        let outcome = match (p, i) {
                            (0, 0) => TaskOutcome::Failed("boom".to_string()),
                            (1, _) if i < 2 => TaskOutcome::Repaired,
                            _ => TaskOutcome::Rendered,
                        };
                        tx.send(ProgressEvent::Finished {
                            family: BackendKind::Local,
                            label: format!("p{}-{}", p, i),
                            outcome,
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        tx.send(ProgressEvent::Aborted { skipped: 3 }).unwrap();
        drop(tx);

        let tally = reporter.finish();
        assert_eq!(tally.total, 40);
        assert_eq!(tally.completed(), 40);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.repaired, 2);
        assert_eq!(tally.rendered, 37);
        assert_eq!(tally.skipped, 3);
        assert_eq!(tally.failures, vec![("p0-0".to_string(), "boom".to_string())]);
    }
}
