//! Named, bounded/unbounded MPMC queues (spec.md §3 "Queues bundle").
//!
//! `crossbeam_channel` is used rather than `std::sync::mpsc` because its
//! `recv_timeout` is a direct match for the original Python's
//! `Queue.get(block=True, timeout=1)`, and its bounded channel exposes
//! `.len()`, which the communication manager's per-stage concurrency check
//! needs (spec.md §4.G `can_process_request`).

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::job::Job;
use crate::request::CommRequest;

const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

fn unbounded_pair<T>() -> (Sender<T>, Receiver<T>) {
    crossbeam_channel::unbounded()
}

/// The data pipeline's fixed set of named job queues (spec.md §3).
pub struct DataQueues {
    pub data_in: (Sender<Job>, Receiver<Job>),
    pub data_out: (Sender<Job>, Receiver<Job>),
    pub finished_data_in: (Sender<Job>, Receiver<Job>),
    pub failed_data_in: (Sender<Job>, Receiver<Job>),
    pub finished_data_out: (Sender<Job>, Receiver<Job>),
    pub failed_data_out: (Sender<Job>, Receiver<Job>),
    pub finished_jobs: (Sender<Job>, Receiver<Job>),
    pub failed_jobs: (Sender<Job>, Receiver<Job>),
}

impl DataQueues {
    pub fn new() -> Self {
        Self {
            data_in: unbounded_pair(),
            data_out: unbounded_pair(),
            finished_data_in: unbounded_pair(),
            failed_data_in: unbounded_pair(),
            finished_data_out: unbounded_pair(),
            failed_data_out: unbounded_pair(),
            finished_jobs: unbounded_pair(),
            failed_jobs: unbounded_pair(),
        }
    }
}

impl Default for DataQueues {
    fn default() -> Self {
        Self::new()
    }
}

/// The communication manager's named queues (spec.md §3, §4.G): one inbound
/// queue per request tag, plus one in-flight queue per asynchronous stage.
pub struct CommQueues {
    pub request_get_jobs: (Sender<Arc<CommRequest>>, Receiver<Arc<CommRequest>>),
    pub update_jobs: (Sender<Arc<CommRequest>>, Receiver<Arc<CommRequest>>),
    pub request_get_events: (Sender<Arc<CommRequest>>, Receiver<Arc<CommRequest>>),
    pub update_events: (Sender<Arc<CommRequest>>, Receiver<Arc<CommRequest>>),
    pub processing_get_jobs: (Sender<Arc<CommRequest>>, Receiver<Arc<CommRequest>>),
    pub processing_get_events: (Sender<Arc<CommRequest>>, Receiver<Arc<CommRequest>>),
}

impl CommQueues {
    pub fn new() -> Self {
        Self {
            request_get_jobs: unbounded_pair(),
            update_jobs: unbounded_pair(),
            request_get_events: unbounded_pair(),
            update_events: unbounded_pair(),
            processing_get_jobs: unbounded_pair(),
            processing_get_events: unbounded_pair(),
        }
    }
}

impl Default for CommQueues {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks for up to one second waiting for an item, returning `None` on
/// empty (spec.md §5 "Queue reads: 1 s").
pub fn dequeue<T>(rx: &Receiver<T>) -> Option<T> {
    rx.recv_timeout(DEQUEUE_TIMEOUT).ok()
}

/// Blocks for up to one second waiting for a job, returning `None` on empty
/// (spec.md §5 "Queue reads: 1 s").
pub fn dequeue_one(rx: &Receiver<Job>) -> Option<Job> {
    dequeue(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequeue_one_returns_none_on_empty_timeout() {
        let (_tx, rx) = crossbeam_channel::unbounded::<Job>();
        let start = std::time::Instant::now();
        assert!(dequeue_one(&rx).is_none());
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
