use crate::sys;

use std::cell::Cell;
use std::os::fd::RawFd;
use std::rc::Rc;

/// Shared ownership of one OS stream handle.
///
/// A `Port` is the single source of truth for whether its descriptor
/// is still open. Clones share that truth, which allows a duplex
/// connection to hand one clone to an input participant and another
/// to an output participant: when either side closes the port, both
/// observe it as closed and get pruned from their dispatch sets on
/// the next cycle.
///
/// Closing happens exactly once, no matter how many clones exist or
/// how many times [`close`](Port::close) is called. If the port is
/// still open when the last clone is dropped, the descriptor is
/// closed then.
#[derive(Clone)]
pub struct Port {
    shared: Rc<Shared>,
}

struct Shared {
    fd: RawFd,
    open: Cell<bool>,
}

impl Port {
    /// Takes ownership of a raw descriptor.
    ///
    /// The descriptor should already be in non-blocking mode; every
    /// participant in this crate assumes its operations never block.
    pub fn new(fd: RawFd) -> Self {
        Self {
            shared: Rc::new(Shared {
                fd,
                open: Cell::new(true),
            }),
        }
    }

    /// Returns the underlying raw descriptor.
    ///
    /// The value is only meaningful while the port is open.
    pub fn fd(&self) -> RawFd {
        self.shared.fd
    }

    /// Reports whether the descriptor has been closed.
    pub fn is_closed(&self) -> bool {
        !self.shared.open.get()
    }

    /// Closes the descriptor. Idempotent.
    pub fn close(&self) {
        if self.shared.open.replace(false) {
            sys::sys_close(self.shared.fd);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if self.open.get() {
            sys::sys_close(self.fd);
        }
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("fd", &self.shared.fd)
            .field("open", &self.shared.open.get())
            .finish()
    }
}
