//! The two long-running reader tasks.
//!
//! ```text
//!  ISR ──▶ WiegandLines ──▶ AcquisitionWorker ──▶ OutboundChannel ──▶ PublisherWorker ──▶ link
//!                                   │                                         │
//!                                   └──── try_lock ── ConnectionRecord ── lock_with_backoff
//! ```
//!
//! Each worker exposes `run_cycle()` for tests and a diverging `run()` for
//! its dedicated thread. A failed cycle is logged and counted; it never ends
//! the loop.

pub mod acquisition;
pub mod publisher;

use crate::diagnostics::ReaderStats;
use crate::feedback::FeedbackSink;
use crate::link::ConnectionRecord;

pub use acquisition::{AcquisitionWorker, CycleOutcome, LinkPoll};
pub use publisher::{PublishOutcome, PublisherWorker};

/// State both workers share by reference.
pub struct WorkerContext<'a, L> {
    pub connection: &'a ConnectionRecord<L>,
    pub feedback: &'a dyn FeedbackSink,
    pub stats: &'a ReaderStats,
}

impl<L> Clone for WorkerContext<'_, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L> Copy for WorkerContext<'_, L> {}
