use super::core::Scope;
use super::participant::{Participant, Sink};
use super::port::Port;
use crate::nonblock::{self, WriteOutcome};

use std::collections::VecDeque;
use std::io;
use std::os::fd::RawFd;

use tracing::warn;

/// The writer a [`QueuedOutput`] drains through.
///
/// The default writer performs a non-blocking write on the port's
/// descriptor; an injected writer lets the queue drain into anything
/// that can report "accepted n bytes" or "not now".
pub trait WriteFn: FnMut(&[u8]) -> io::Result<WriteOutcome> {}
impl<F: FnMut(&[u8]) -> io::Result<WriteOutcome>> WriteFn for F {}

/// A backpressure-aware buffered writer.
///
/// Writes are accepted immediately into an ordered queue of pending
/// buffers; actual draining happens in [`process`](Participant::process)
/// when the reactor reports the descriptor writable. A partial write
/// requeues the unwritten remainder at the head, preserving byte
/// order across however many cycles the drain takes.
///
/// Failure semantics are load-bearing here: a "would block" outcome
/// requeues and returns normally (the reactor will offer the
/// descriptor again), while a fatal error closes the handle — after
/// which the entry is pruned and the queue's contents are abandoned,
/// since there is nowhere left to send them.
pub struct QueuedOutput {
    port: Port,
    queue: VecDeque<Vec<u8>>,
    closing: bool,
    writer: Box<dyn WriteFn>,
}

impl QueuedOutput {
    /// A queued writer draining into the port's descriptor.
    pub fn new(port: Port) -> Self {
        let fd = port.fd();
        Self::with_writer(port, move |buffer| nonblock::write(fd, buffer))
    }

    /// A queued writer draining through a custom write function.
    pub fn with_writer(port: Port, writer: impl WriteFn + 'static) -> Self {
        Self {
            port,
            queue: VecDeque::new(),
            closing: false,
            writer: Box::new(writer),
        }
    }

    /// Enqueues `data` at the tail of the queue.
    ///
    /// Returns the full length, matching the "accepted for sending"
    /// contract of a buffered writer.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.push(data.to_vec());
        data.len()
    }

    /// Enqueues an owned buffer at the tail without copying.
    pub fn push(&mut self, data: Vec<u8>) {
        if !data.is_empty() {
            self.queue.push_back(data);
        }
    }

    /// Requests close-after-drain.
    ///
    /// With data still queued, the handle stays open until subsequent
    /// `process` calls drain it. With an empty queue the handle is
    /// closed eagerly, since an empty sink is never offered to the
    /// readiness wait again.
    pub fn close(&mut self) {
        if self.queue.is_empty() {
            self.port.close();
            self.closing = false;
        } else {
            self.closing = true;
        }
    }

    /// Bytes currently queued and not yet accepted by the descriptor.
    pub fn pending(&self) -> usize {
        self.queue.iter().map(Vec::len).sum()
    }
}

impl Participant for QueuedOutput {
    fn fd(&self) -> RawFd {
        self.port.fd()
    }

    fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    /// Eligible exactly while data is pending.
    fn needs_processing(&self) -> bool {
        !self.port.is_closed() && !self.queue.is_empty()
    }

    fn process(&mut self, _scope: &mut Scope<'_>) -> io::Result<()> {
        while let Some(mut buffer) = self.queue.pop_front() {
            match (self.writer)(&buffer) {
                Ok(WriteOutcome::Wrote(n)) if n < buffer.len() => {
                    buffer.drain(..n);
                    self.queue.push_front(buffer);
                    break;
                }
                Ok(WriteOutcome::Wrote(_)) => {}
                Ok(WriteOutcome::WouldBlock) => {
                    self.queue.push_front(buffer);
                    break;
                }
                Err(err) => {
                    // Peer is gone; nothing left to drain.
                    warn!(fd = self.port.fd(), error = %err, "queued write failed, closing");
                    self.port.close();
                    self.closing = false;
                    self.queue.clear();
                    return Ok(());
                }
            }
        }

        if self.closing && self.queue.is_empty() {
            self.port.close();
            self.closing = false;
        }

        Ok(())
    }
}

impl Sink for QueuedOutput {}

impl io::Write for QueuedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        Ok(QueuedOutput::write(self, data))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
