use super::core::{Command, Scope};
use super::participant::{Participant, Sink, Source};
use super::port::Port;
use crate::nonblock::{self, AcceptOutcome};
use crate::sys;

use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use tracing::debug;

/// Callback producing the participants for a newly accepted
/// connection.
///
/// Receives the accepted connection as an open, non-blocking [`Port`]
/// and returns the source and/or sink to register for it; either half
/// may be `None` for a one-directional connection.
pub trait AcceptFn:
    FnMut(Port) -> io::Result<(Option<Box<dyn Source>>, Option<Box<dyn Sink>>)>
{
}

impl<F: FnMut(Port) -> io::Result<(Option<Box<dyn Source>>, Option<Box<dyn Sink>>)>> AcceptFn
    for F
{
}

/// A [`Source`] wrapping a listening socket.
///
/// Each readiness notification accepts exactly one pending
/// connection; further pending connections are picked up on the next
/// cycle rather than in a tight loop, keeping cycle latency bounded.
/// The accept callback decides what to register for the connection.
///
/// Accept failures and callback errors are routed to the handler
/// attached via [`on_error`](Listener::on_error) when present;
/// otherwise they propagate out of the reactor's dispatch.
pub struct Listener {
    port: Port,
    accept: Box<dyn AcceptFn>,
    on_error: Option<Box<dyn FnMut(io::Error)>>,
}

impl Listener {
    /// Wraps a listening descriptor.
    ///
    /// The descriptor is switched to non-blocking mode so a spurious
    /// readiness notification cannot park the reactor in `accept`.
    pub fn new(fd: RawFd, accept: impl AcceptFn + 'static) -> io::Result<Self> {
        sys::sys_set_nonblocking(fd)?;

        Ok(Self {
            port: Port::new(fd),
            accept: Box::new(accept),
            on_error: None,
        })
    }

    /// Returns the local address of the listening socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        sys::sys_sockname(self.port.fd())
    }

    /// Attaches an error handler and returns the listener.
    ///
    /// With a handler attached, accept failures and callback errors
    /// no longer stop the loop.
    pub fn on_error(mut self, handler: impl FnMut(io::Error) + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    fn try_accept(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        let (fd, addr) = match nonblock::accept(self.port.fd())? {
            AcceptOutcome::Accepted(fd, addr) => (fd, addr),
            AcceptOutcome::WouldBlock => return Ok(()),
        };

        debug!(fd, peer = %addr, "accepted connection");

        let (source, sink) = (self.accept)(Port::new(fd))?;

        if let Some(source) = source {
            scope.push(Command::AddInput(source));
        }
        if let Some(sink) = sink {
            scope.push(Command::AddOutput(sink));
        }

        Ok(())
    }
}

impl Participant for Listener {
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
        match self.try_accept(scope) {
            Ok(()) => Ok(()),
            Err(err) => match &mut self.on_error {
                Some(handler) => {
                    handler(err);
                    Ok(())
                }
                None => Err(err),
            },
        }
    }
}

impl Source for Listener {}
