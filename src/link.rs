//! Host link abstraction and the shared Connection Record.
//!
//! The link is any connected byte stream (on device: the Bluetooth SPP
//! endpoint's VFS file descriptor). Bring-up and teardown belong to the
//! connection manager; the workers only ever reach the link handle through
//! the record's lock.
//!
//! Lock discipline:
//! - acquisition worker: [`ConnectionRecord::try_lock`], never waits;
//! - publisher worker: [`ConnectionRecord::lock_with_backoff`], bounded;
//! - both release by dropping the guard, so only a held lock is released.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Instant;

use crate::error::LinkError;

/// Byte-oriented link endpoint.
pub trait Link: Send {
    /// Read up to `buf.len()` bytes without blocking.
    /// `Ok(0)` or `Err(LinkError::WouldBlock)` both mean "nothing yet".
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Write some prefix of `data`; returns how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError>;
}

/// Write `data` in full, retrying partial writes. Stops at the first failed
/// call; the link itself is left as it is.
pub fn write_all<L: Link + ?Sized>(link: &mut L, data: &[u8]) -> Result<(), LinkError> {
    let mut written = 0;
    while written < data.len() {
        match link.write(&data[written..])? {
            0 => return Err(LinkError::WriteZero),
            n => written += n,
        }
    }
    Ok(())
}

/// Shared record both workers serialize link access through.
pub struct ConnectionRecord<L> {
    handle: Mutex<Option<L>>,
    active: AtomicBool,
}

impl<L: Link> ConnectionRecord<L> {
    /// Created at startup with no link attached.
    pub const fn new() -> Self {
        Self {
            handle: Mutex::new(None),
            active: AtomicBool::new(false),
        }
    }

    /// Attach a freshly connected link. Called by the connection manager.
    pub fn establish(&self, link: L) {
        let mut guard = self.lock_blocking();
        *guard = Some(link);
        self.active.store(true, Ordering::Release);
    }

    /// Detach the link, handing it back to the connection manager.
    pub fn teardown(&self) -> Option<L> {
        let mut guard = self.lock_blocking();
        self.active.store(false, Ordering::Release);
        guard.take()
    }

    /// Whether a link is currently attached. Advisory only; the handle
    /// itself must still be checked under the lock.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Non-blocking acquire. `None` if anyone else holds the lock.
    pub fn try_lock(&self) -> Option<LinkGuard<'_, L>> {
        match self.handle.try_lock() {
            Ok(guard) => Some(LinkGuard { guard }),
            Err(TryLockError::Poisoned(poisoned)) => Some(LinkGuard {
                guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Acquire with exponential backoff (1 ms doubling up to `max_step`),
    /// giving up after `timeout`.
    pub fn lock_with_backoff(
        &self,
        timeout: Duration,
        max_step: Duration,
    ) -> Result<LinkGuard<'_, L>, LinkError> {
        let deadline = Instant::now() + timeout;
        let mut step = Duration::from_millis(1).min(max_step);
        loop {
            if let Some(guard) = self.try_lock() {
                return Ok(guard);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(LinkError::LockTimeout);
            }
            std::thread::sleep(step.min(deadline - now));
            step = (step * 2).min(max_step);
        }
    }

    fn lock_blocking(&self) -> MutexGuard<'_, Option<L>> {
        self.handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<L: Link> Default for ConnectionRecord<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of holding the connection lock. Dropping it releases the lock.
pub struct LinkGuard<'a, L> {
    guard: MutexGuard<'a, Option<L>>,
}

impl<L: Link> LinkGuard<'_, L> {
    /// The attached link, if any.
    pub fn link_mut(&mut self) -> Option<&mut L> {
        self.guard.as_mut()
    }

    pub fn is_connected(&self) -> bool {
        self.guard.is_some()
    }
}
