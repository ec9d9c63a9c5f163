//! The process-wide graceful-stop signal observed by every worker
//! (spec.md §5 "Cancellation"). Named and shaped after the original's
//! `threading.Event`-backed `args.graceful_stop`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
