use super::core::Scope;
use super::participant::{Participant, Sink};
use super::port::Port;
use crate::nonblock::{self, ConnectOutcome};
use crate::sys;

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::fd::RawFd;

use tracing::debug;

/// A [`Sink`]-shaped state machine driving a non-blocking outbound
/// connect.
///
/// Construction creates the socket and issues the initial connect,
/// which ordinarily reports "in progress". The connector then sits in
/// the output set — a connecting socket signals completion through
/// write readiness — and each `process` call re-checks the attempt:
///
/// - still in flight: no state change, stays eligible;
/// - completed: the completion callback receives the connected
///   [`Port`] and a [`Scope`] to register it with, and the connector
///   deregisters itself;
/// - failed fatally: the socket is closed and the error is routed to
///   the handler attached via [`on_error`](SocketConnector::on_error),
///   or propagates.
pub struct SocketConnector {
    port: Port,
    addr: SocketAddr,
    connected: bool,
    on_connected: Option<Box<dyn FnOnce(&mut Scope<'_>, Port) -> io::Result<()>>>,
    on_error: Option<Box<dyn FnMut(io::Error)>>,
}

impl SocketConnector {
    /// Starts a TCP connect to `addr`.
    ///
    /// `addr` is anything resolvable to a socket address
    /// (`"127.0.0.1:7000"`, `("localhost", 7000)`, a `SocketAddr`).
    /// Resolution is the only blocking step and happens here, not in
    /// the reactor.
    pub fn tcp(
        addr: impl ToSocketAddrs,
        on_connected: impl FnOnce(&mut Scope<'_>, Port) -> io::Result<()> + 'static,
    ) -> io::Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing"))?;

        let fd = sys::sys_socket(sys::sys_domain(&addr))?;
        let port = Port::new(fd);

        // First attempt; EINPROGRESS is the normal outcome for a
        // non-blocking socket and completion is observed in process().
        match nonblock::connect(fd, &addr) {
            Ok(_) => {}
            Err(err) => {
                port.close();
                return Err(err);
            }
        }

        debug!(fd, peer = %addr, "connect started");

        Ok(Self {
            port,
            addr,
            connected: false,
            on_connected: Some(Box::new(on_connected)),
            on_error: None,
        })
    }

    /// Attaches an error handler and returns the connector.
    ///
    /// With a handler attached, a fatal connect failure no longer
    /// stops the loop; the socket is still closed.
    pub fn on_error(mut self, handler: impl FnMut(io::Error) + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Whether the connection has been established.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn drive(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        match nonblock::connect(self.port.fd(), &self.addr)? {
            ConnectOutcome::Pending => Ok(()),
            ConnectOutcome::Connected => {
                self.connected = true;
                debug!(fd = self.port.fd(), peer = %self.addr, "connected");

                scope.del_output(self.port.fd());

                if let Some(on_connected) = self.on_connected.take() {
                    on_connected(scope, self.port.clone())?;
                }

                Ok(())
            }
        }
    }
}

impl Participant for SocketConnector {
    fn fd(&self) -> RawFd {
        self.port.fd()
    }

    fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    fn needs_processing(&self) -> bool {
        !self.connected && !self.port.is_closed()
    }

    fn process(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        match self.drive(scope) {
            Ok(()) => Ok(()),
            Err(err) => {
                // A connect-phase failure means the socket is unusable.
                // An error from the completion callback is not: the
                // callback owns the connection now.
                if !self.connected {
                    self.port.close();
                }
                match &mut self.on_error {
                    Some(handler) => {
                        handler(err);
                        Ok(())
                    }
                    None => Err(err),
                }
            }
        }
    }
}

impl Sink for SocketConnector {}
