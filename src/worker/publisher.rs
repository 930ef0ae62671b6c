//! Publisher worker: outbound channel to link, one message at a time.
//!
//! For each message: take the connection lock (bounded backoff), write it in
//! full, release the lock, then drop the message. A failed write abandons
//! that message only; the link stays attached and reconnecting is the
//! connection manager's job.

use core::time::Duration;

use log::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::error::LinkError;
use crate::feedback::{DropReason, ReaderEvent};
use crate::link::{Link, write_all};
use crate::message::{Message, OutboundRx};

use super::WorkerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing arrived within the receive timeout.
    Idle,
    Sent { len: usize },
    /// The message was dropped; carries why.
    Failed(LinkError),
}

pub struct PublisherWorker<'a, L> {
    inbound: OutboundRx<'a>,
    ctx: WorkerContext<'a, L>,
    receive_timeout: Duration,
    lock_timeout: Duration,
    lock_backoff_max: Duration,
}

impl<'a, L: Link> PublisherWorker<'a, L> {
    pub fn new(config: &ReaderConfig, inbound: OutboundRx<'a>, ctx: WorkerContext<'a, L>) -> Self {
        Self {
            inbound,
            ctx,
            receive_timeout: Duration::from_millis(config.channel_timeout_ms.into()),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms.into()),
            lock_backoff_max: Duration::from_millis(config.lock_backoff_max_ms.into()),
        }
    }

    pub fn run(mut self) -> ! {
        info!(target: "publisher", "publisher started (lock timeout {:?})", self.lock_timeout);
        loop {
            self.run_cycle();
        }
    }

    /// Wait briefly for one message and try to deliver it.
    pub fn run_cycle(&mut self) -> PublishOutcome {
        let Some(msg) = self.inbound.receive_timeout(self.receive_timeout) else {
            return PublishOutcome::Idle;
        };

        let result = self.deliver(&msg);
        // Lock is released inside deliver; the message goes last.
        let outcome = self.report(&msg, result);
        drop(msg);
        outcome
    }

    fn deliver(&self, msg: &Message) -> Result<(), LinkError> {
        let mut guard = self
            .ctx
            .connection
            .lock_with_backoff(self.lock_timeout, self.lock_backoff_max)?;
        let link = guard.link_mut().ok_or(LinkError::NotConnected)?;
        write_all(link, msg.as_bytes())
    }

    fn report(&self, msg: &Message, result: Result<(), LinkError>) -> PublishOutcome {
        let stats = self.ctx.stats;
        let feedback = self.ctx.feedback;
        match result {
            Ok(()) => {
                info!(target: "publisher", "sent {}", msg.as_str());
                stats.record_sent(msg.len());
                feedback.notify(&ReaderEvent::MessageSent { len: msg.len() });
                PublishOutcome::Sent { len: msg.len() }
            }
            Err(LinkError::NotConnected) => {
                debug!(target: "publisher", "no link, dropping {}", msg.as_str());
                stats.record_link_absent();
                feedback.notify(&ReaderEvent::MessageDropped(DropReason::NotConnected));
                PublishOutcome::Failed(LinkError::NotConnected)
            }
            Err(LinkError::LockTimeout) => {
                warn!(target: "publisher", "connection lock busy for {:?}, dropping {}",
                    self.lock_timeout, msg.as_str());
                stats.record_lock_timeout();
                feedback.notify(&ReaderEvent::MessageDropped(DropReason::LockTimeout));
                PublishOutcome::Failed(LinkError::LockTimeout)
            }
            Err(e) => {
                warn!(target: "publisher", "write of {} failed: {}", msg.as_str(), e);
                stats.record_write_fault();
                feedback.notify(&ReaderEvent::WriteFailed(e));
                PublishOutcome::Failed(e)
            }
        }
    }
}
