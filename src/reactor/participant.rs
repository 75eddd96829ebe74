use super::core::Scope;

use std::cell::RefCell;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;

/// An object that can be registered in a dispatch set.
///
/// The reactor asks three questions of a participant:
/// - which descriptor it is keyed on ([`fd`](Participant::fd)),
/// - whether it currently wants readiness delivered
///   ([`needs_processing`](Participant::needs_processing)),
/// - whether its descriptor is gone and the entry should be pruned
///   ([`is_closed`](Participant::is_closed)).
///
/// When the descriptor is reported ready, the reactor invokes
/// [`process`](Participant::process) with a [`Scope`] through which
/// the participant may register or deregister other participants, or
/// stop the loop.
///
/// `process` must not block: the reactor is single-threaded and
/// cooperative, so a blocking participant stalls every other one.
pub trait Participant {
    /// The descriptor this participant is keyed on.
    fn fd(&self) -> RawFd;

    /// Whether the underlying descriptor has been closed.
    fn is_closed(&self) -> bool;

    /// Whether this participant should be offered to the readiness
    /// wait this cycle.
    ///
    /// Recomputed every cycle; a participant may change its own
    /// eligibility between cycles. Defaults to `false`, so a
    /// participant that never overrides this is inert.
    fn needs_processing(&self) -> bool {
        false
    }

    /// Invoked when the descriptor is reported ready.
    ///
    /// An `Err` here is a participant failure: it propagates out of
    /// the reactor's dispatch and stops the loop.
    fn process(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        let _ = scope;
        Ok(())
    }
}

/// Marker for read-direction participants, registered in the input
/// set and processed on read readiness.
pub trait Source: Participant {}

/// Marker for write-direction participants, registered in the output
/// or error set and processed on write readiness (or on an error
/// condition).
pub trait Sink: Participant {}

/// Shared participants.
///
/// A participant often needs to be reachable both from its dispatch
/// set and from the callbacks that feed it (an input callback writing
/// into a [`QueuedOutput`](super::QueuedOutput) on the same
/// connection, say). Wrapping it in `Rc<RefCell<_>>` and registering
/// a clone keeps one object with shared access; dispatch is strictly
/// sequential, so the borrows never overlap.
impl<P: Participant + ?Sized> Participant for Rc<RefCell<P>> {
    fn fd(&self) -> RawFd {
        self.borrow().fd()
    }

    fn is_closed(&self) -> bool {
        self.borrow().is_closed()
    }

    fn needs_processing(&self) -> bool {
        self.borrow().needs_processing()
    }

    fn process(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        self.borrow_mut().process(scope)
    }
}

impl<P: Source + ?Sized> Source for Rc<RefCell<P>> {}

impl<P: Sink + ?Sized> Sink for Rc<RefCell<P>> {}
