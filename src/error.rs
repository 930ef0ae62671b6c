//! Unified error types for the reader firmware.
//!
//! A single `Error` enum that every subsystem converts into, so worker loops
//! can log any cycle failure the same way. All variants are `Copy`; nothing
//! on the error path allocates.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral or interrupt registration failed. Fatal at startup.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
    /// The host link failed or is absent.
    Link(LinkError),
    /// A message could not be built or queued.
    Message(MessageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Message(e) => write!(f, "message: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No link handle is attached to the connection record.
    NotConnected,
    /// The connection lock could not be taken in time.
    LockTimeout,
    /// A read/write call failed; carries the platform errno.
    Io(i32),
    /// A write call accepted zero bytes.
    WriteZero,
    /// Non-blocking read found nothing to read.
    WouldBlock,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "no active link"),
            Self::LockTimeout => write!(f, "connection lock timed out"),
            Self::Io(errno) => write!(f, "I/O error (errno={errno})"),
            Self::WriteZero => write!(f, "write accepted zero bytes"),
            Self::WouldBlock => write!(f, "no data available"),
        }
    }
}

impl std::error::Error for LinkError {}

impl std::error::Error for Error {}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Message errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    /// Payload is longer than the link's maximum send size.
    TooLong(usize),
    /// Outbound channel stayed full for the whole bounded wait.
    QueueFull,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong(len) => write!(f, "payload of {len} bytes exceeds link maximum"),
            Self::QueueFull => write!(f, "outbound queue full"),
        }
    }
}

impl From<MessageError> for Error {
    fn from(e: MessageError) -> Self {
        Self::Message(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
