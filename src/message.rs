//! Outbound messages and the worker-to-worker channel.
//!
//! Uses an `embassy-sync` bounded channel behind a blocking critical-section
//! mutex, the same primitive the rest of the firmware uses for inter-task
//! queues. The channel is split exactly once into a sender (acquisition
//! worker) and a receiver (publisher worker), so strict FIFO between one
//! producer and one consumer holds by construction.
//!
//! ```text
//! ┌──────────────────┐  Message  ┌──────────────────┐
//! │ Acquisition      │─────────▶│ Publisher        │──▶ link
//! │ (OutboundTx)     │  FIFO     │ (OutboundRx)     │
//! └──────────────────┘           └──────────────────┘
//! ```
//!
//! Ownership: a `Message` belongs to the acquisition worker until
//! `send_timeout` succeeds. On timeout it is handed back and the worker drops
//! it. After a successful send the publisher owns it and drops it once the
//! write has been attempted.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::Vec;

use crate::config::{MAX_MESSAGE_SIZE, OUTBOUND_DEPTH};
use crate::error::MessageError;

/// Sleep between retries while waiting on a full or empty channel.
const POLL_STEP: Duration = Duration::from_millis(1);

/// One encoded card read (or any payload bound for the link).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    data: Vec<u8, MAX_MESSAGE_SIZE>,
}

impl Message {
    /// Copy `bytes` into a new message. Fails if longer than the link's
    /// maximum send size.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MessageError> {
        let data = Vec::from_slice(bytes).map_err(|()| MessageError::TooLong(bytes.len()))?;
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Payload as text for logging. Card reads are always ASCII hex.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.data).unwrap_or("<binary>")
    }
}

/// Bounded FIFO of [`Message`]s between the two workers.
pub struct OutboundChannel {
    inner: Channel<CriticalSectionRawMutex, Message, OUTBOUND_DEPTH>,
    split: AtomicBool,
}

impl OutboundChannel {
    pub const fn new() -> Self {
        Self {
            inner: Channel::new(),
            split: AtomicBool::new(false),
        }
    }

    /// Hand out the single sender/receiver pair. Returns `None` on every
    /// call after the first.
    pub fn split(&self) -> Option<(OutboundTx<'_>, OutboundRx<'_>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((OutboundTx { channel: self }, OutboundRx { channel: self }))
    }

    /// Messages currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for OutboundChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half. Held by the acquisition worker.
pub struct OutboundTx<'a> {
    channel: &'a OutboundChannel,
}

impl OutboundTx<'_> {
    /// Enqueue, waiting up to `timeout` for room. On timeout the message is
    /// returned to the caller, who owns (and drops) it.
    pub fn send_timeout(&self, msg: Message, timeout: Duration) -> Result<(), Message> {
        let deadline = Instant::now() + timeout;
        let mut msg = msg;
        loop {
            match self.channel.inner.try_send(msg) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => {
                    if Instant::now() >= deadline {
                        return Err(back);
                    }
                    msg = back;
                    std::thread::sleep(POLL_STEP);
                }
            }
        }
    }
}

/// Consumer half. Held by the publisher worker.
pub struct OutboundRx<'a> {
    channel: &'a OutboundChannel,
}

impl OutboundRx<'_> {
    /// Dequeue the oldest message, waiting up to `timeout` for one.
    pub fn receive_timeout(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(msg) = self.channel.inner.try_receive() {
                return Some(msg);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(POLL_STEP);
        }
    }

    /// Dequeue without waiting.
    pub fn try_receive(&self) -> Option<Message> {
        self.channel.inner.try_receive().ok()
    }
}
