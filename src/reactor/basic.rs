use super::core::Scope;
use super::participant::{Participant, Sink, Source};
use super::port::Port;

use std::io;
use std::os::fd::RawFd;

/// Adapts a callback into a [`Source`].
///
/// A `BasicInput` is eligible whenever its port is open; the callback
/// runs each time the descriptor is reported readable. The callback
/// is expected to drain the descriptor with non-blocking reads and
/// to close the port when the stream ends, which is what eventually
/// removes the entry from the input set.
pub struct BasicInput {
    port: Port,
    callback: Box<dyn FnMut(&mut Scope<'_>) -> io::Result<()>>,
}

impl BasicInput {
    /// Wraps `callback` around an open port.
    pub fn new(
        port: Port,
        callback: impl FnMut(&mut Scope<'_>) -> io::Result<()> + 'static,
    ) -> Self {
        Self {
            port,
            callback: Box::new(callback),
        }
    }
}

impl Participant for BasicInput {
    fn fd(&self) -> RawFd {
        self.port.fd()
    }

    fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    fn needs_processing(&self) -> bool {
        !self.port.is_closed()
    }

    fn process(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        (self.callback)(scope)
    }
}

impl Source for BasicInput {}

/// Adapts a callback into a [`Sink`].
///
/// Writable-readiness is "almost always true" for a healthy socket,
/// so a sink that reported itself eligible whenever open would spin
/// the reactor. The caller therefore supplies the actual gating
/// predicate — typically "do I have something to say" — and the
/// adapter only joins the readiness wait while the predicate holds.
pub struct BasicOutput {
    port: Port,
    ready: Box<dyn Fn() -> bool>,
    callback: Box<dyn FnMut(&mut Scope<'_>) -> io::Result<()>>,
}

impl BasicOutput {
    /// Wraps `callback` around an open port, gated by `ready`.
    pub fn new(
        port: Port,
        ready: impl Fn() -> bool + 'static,
        callback: impl FnMut(&mut Scope<'_>) -> io::Result<()> + 'static,
    ) -> Self {
        Self {
            port,
            ready: Box::new(ready),
            callback: Box::new(callback),
        }
    }
}

impl Participant for BasicOutput {
    fn fd(&self) -> RawFd {
        self.port.fd()
    }

    fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    fn needs_processing(&self) -> bool {
        !self.port.is_closed() && (self.ready)()
    }

    fn process(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        (self.callback)(scope)
    }
}

impl Sink for BasicOutput {}
