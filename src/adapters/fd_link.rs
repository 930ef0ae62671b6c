//! [`Link`] over a file descriptor.
//!
//! On device this is the Bluetooth SPP VFS descriptor handed over by the
//! connection manager when a host connects. The descriptor belongs to the
//! manager: dropping an `FdLink` never closes it.
//!
//! The acquisition worker reads while holding the connection lock, so the
//! descriptor is switched to `O_NONBLOCK` on attach; a blocking read would
//! hold the publisher off the link.

use std::fs::File;
use std::io::{self, Read, Write};
use std::mem::ManuallyDrop;
use std::os::fd::{FromRawFd, RawFd};

use log::{error, info};

use crate::error::LinkError;
use crate::link::{ConnectionRecord, Link};

pub struct FdLink {
    fd: RawFd,
    file: ManuallyDrop<File>,
}

impl FdLink {
    /// Wrap `fd` without taking ownership of it.
    ///
    /// # Safety
    /// `fd` must be an open descriptor that stays open for as long as this
    /// `FdLink` exists.
    pub unsafe fn borrow_raw(fd: RawFd) -> Self {
        Self {
            fd,
            // SAFETY: caller guarantees `fd` is open; ManuallyDrop stops us
            // from closing it.
            file: ManuallyDrop::new(unsafe { File::from_raw_fd(fd) }),
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd
    }

    /// Put the descriptor into non-blocking mode, keeping its other flags.
    pub fn set_nonblocking(&self) -> Result<(), LinkError> {
        set_nonblocking(self.fd).map_err(map_io)
    }
}

#[cfg(target_os = "espidf")]
fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    use esp_idf_svc::sys::{F_GETFL, F_SETFL, O_NONBLOCK, fcntl};

    // SAFETY: F_GETFL/F_SETFL are valid on any open VFS descriptor.
    let flags = unsafe { fcntl(fd, F_GETFL as _) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { fcntl(fd, F_SETFL as _, flags | O_NONBLOCK as i32) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    use std::os::unix::net::UnixStream;

    // SAFETY: `fd` is open (borrow_raw contract); ManuallyDrop keeps it open.
    let stream = ManuallyDrop::new(unsafe { UnixStream::from_raw_fd(fd) });
    stream.set_nonblocking(true)
}

fn map_io(err: io::Error) -> LinkError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => LinkError::WouldBlock,
        io::ErrorKind::WriteZero => LinkError::WriteZero,
        _ => LinkError::Io(err.raw_os_error().unwrap_or(-1)),
    }
}

impl Link for FdLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.file.read(buf).map_err(map_io)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        self.file.write(data).map_err(map_io)
    }
}

/// Connection manager hook: a host connected on `fd`.
///
/// The descriptor is made non-blocking first; if that fails the link is not
/// established and the record stays as it was.
///
/// # Safety
/// Same contract as [`FdLink::borrow_raw`]; the manager must call
/// [`detach`] before closing `fd`.
pub unsafe fn attach(record: &ConnectionRecord<FdLink>, fd: RawFd) -> Result<(), LinkError> {
    // SAFETY: forwarded from the caller.
    let link = unsafe { FdLink::borrow_raw(fd) };
    if let Err(e) = link.set_nonblocking() {
        error!("link: fd {} cannot be made non-blocking: {}", fd, e);
        return Err(e);
    }
    record.establish(link);
    info!("link: attached fd {}", fd);
    Ok(())
}

/// Connection manager hook: the host went away.
pub fn detach(record: &ConnectionRecord<FdLink>) {
    if let Some(link) = record.teardown() {
        info!("link: detached fd {}", link.raw_fd());
    }
}
