//! Platform-specific syscall layer.
//!
//! This module wraps the OS primitives the reactor is built on:
//! - the readiness-wait primitive (`poll(2)` on unix),
//! - raw non-blocking read/write/accept/connect calls,
//! - socket creation and address conversion.
//!
//! Everything above this layer works in terms of `RawFd` and
//! `io::Result`; errno decoding into "would block" versus fatal
//! outcomes happens in the [`crate::nonblock`] module.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub(crate) use unix::*;
