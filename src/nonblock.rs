//! Non-blocking I/O operations with explicit outcomes.
//!
//! "Not ready yet" is the common case on a loaded reactor, so it is
//! modelled as a value, not an error: every operation here returns a
//! tagged outcome where `WouldBlock`/`Pending` means "retry on the
//! next readiness cycle". An `Err` from these functions is always
//! fatal for the descriptor — the resource is no longer usable and
//! should be closed.
//!
//! `EINTR` is folded into the retryable case: the descriptor is
//! non-blocking, so the caller loses nothing by trying again on the
//! next cycle.

use crate::sys;

use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;

/// Outcome of a non-blocking read attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were read into the buffer.
    Data(usize),

    /// The descriptor has no data available right now.
    WouldBlock,

    /// The peer performed an orderly shutdown; no more data will arrive.
    Eof,
}

/// Outcome of a non-blocking write attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// `n` bytes were accepted by the descriptor. May be short.
    Wrote(usize),

    /// The descriptor cannot accept any bytes right now.
    WouldBlock,
}

/// Outcome of a non-blocking accept attempt.
#[derive(Debug)]
pub enum AcceptOutcome {
    /// A pending connection was accepted. The new descriptor is
    /// already in non-blocking mode.
    Accepted(RawFd, SocketAddr),

    /// No connection is pending right now.
    WouldBlock,
}

/// Outcome of a non-blocking connect attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The connection is established.
    Connected,

    /// The connection attempt is still in flight.
    Pending,
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Reads from a non-blocking descriptor into `buffer`.
pub fn read(fd: RawFd, buffer: &mut [u8]) -> io::Result<ReadOutcome> {
    let n = sys::sys_read(fd, buffer);

    if n == 0 {
        return Ok(ReadOutcome::Eof);
    }

    if n < 0 {
        let err = io::Error::last_os_error();
        if is_retryable(&err) {
            return Ok(ReadOutcome::WouldBlock);
        }
        return Err(err);
    }

    Ok(ReadOutcome::Data(n as usize))
}

/// Writes `buffer` to a non-blocking descriptor.
///
/// A short count is a normal outcome; the caller is expected to
/// requeue the unwritten remainder.
pub fn write(fd: RawFd, buffer: &[u8]) -> io::Result<WriteOutcome> {
    let n = sys::sys_write(fd, buffer);

    if n < 0 {
        let err = io::Error::last_os_error();
        if is_retryable(&err) {
            return Ok(WriteOutcome::WouldBlock);
        }
        return Err(err);
    }

    Ok(WriteOutcome::Wrote(n as usize))
}

/// Accepts one pending connection from a non-blocking listening
/// descriptor.
pub fn accept(fd: RawFd) -> io::Result<AcceptOutcome> {
    match sys::sys_accept(fd) {
        Ok((client, addr)) => Ok(AcceptOutcome::Accepted(client, addr)),
        Err(err) if is_retryable(&err) => Ok(AcceptOutcome::WouldBlock),
        Err(err) => Err(err),
    }
}

/// Drives a non-blocking connect on `fd` towards `addr`.
///
/// Safe to call repeatedly: an in-flight attempt reports `Pending`,
/// a finished one reports `Connected` (the OS answers `EISCONN` once
/// the socket is connected).
pub fn connect(fd: RawFd, addr: &SocketAddr) -> io::Result<ConnectOutcome> {
    match sys::sys_connect(fd, addr) {
        Ok(()) => Ok(ConnectOutcome::Connected),
        Err(err) => match err.raw_os_error() {
            Some(libc::EISCONN) => Ok(ConnectOutcome::Connected),
            Some(libc::EINPROGRESS) | Some(libc::EALREADY) | Some(libc::EAGAIN)
            | Some(libc::EINTR) => Ok(ConnectOutcome::Pending),
            _ => Err(err),
        },
    }
}
