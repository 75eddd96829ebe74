use super::dispatch_set::DispatchSet;
use super::listener::{AcceptFn, Listener};
use super::participant::{Sink, Source};
use crate::error::{Error, Result};
use crate::sys;

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use tracing::{debug, trace};

/// Wait clamp applied when idle callbacks are registered and the
/// caller asked for an unbounded wait. Without it, idle callbacks
/// would never run while the reactor is parked on a cold descriptor
/// set.
const IDLE_TICK: Duration = Duration::from_secs(1);

/// Handle identifying a registered idle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlerToken(usize);

/// Mutations requested by participants during dispatch.
///
/// Participants cannot touch the reactor directly while it is
/// dispatching (the dispatch sets own them), so registrations and
/// removals are queued as commands and applied once the three sets
/// have run, before idle callbacks.
pub(crate) enum Command {
    AddInput(Box<dyn Source>),
    AddOutput(Box<dyn Sink>),
    AddErr(Box<dyn Sink>),
    DelInput(RawFd),
    DelOutput(RawFd),
    DelErr(RawFd),
    Remove(RawFd),
    Done,
}

/// Registration context handed to every `process` call.
///
/// This is the explicit replacement for an ambient "current reactor"
/// reference: a participant that wants to register an accepted
/// connection, deregister itself, or stop the loop does so through
/// the scope it was invoked with.
pub struct Scope<'a> {
    commands: &'a mut Vec<Command>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(commands: &'a mut Vec<Command>) -> Self {
        Self { commands }
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Queues a source for registration in the input set.
    pub fn add_input(&mut self, source: impl Source + 'static) {
        self.push(Command::AddInput(Box::new(source)));
    }

    /// Queues a sink for registration in the output set.
    pub fn add_output(&mut self, sink: impl Sink + 'static) {
        self.push(Command::AddOutput(Box::new(sink)));
    }

    /// Queues a sink for registration in the error set.
    pub fn add_err(&mut self, sink: impl Sink + 'static) {
        self.push(Command::AddErr(Box::new(sink)));
    }

    /// Queues removal of the input participant keyed on `fd`.
    pub fn del_input(&mut self, fd: RawFd) {
        self.push(Command::DelInput(fd));
    }

    /// Queues removal of the output participant keyed on `fd`.
    pub fn del_output(&mut self, fd: RawFd) {
        self.push(Command::DelOutput(fd));
    }

    /// Queues removal of the error participant keyed on `fd`.
    pub fn del_err(&mut self, fd: RawFd) {
        self.push(Command::DelErr(fd));
    }

    /// Queues removal of `fd` from every set.
    pub fn remove(&mut self, fd: RawFd) {
        self.push(Command::Remove(fd));
    }

    /// Queues registration of a [`Listener`] on a listening socket.
    ///
    /// The descriptor is switched to non-blocking mode.
    pub fn add_listener(&mut self, fd: RawFd, accept: impl AcceptFn + 'static) -> io::Result<()> {
        let listener = Listener::new(fd, accept)?;
        self.push(Command::AddInput(Box::new(listener)));
        Ok(())
    }

    /// Requests loop shutdown.
    ///
    /// Pending output is flushed before the done flag is raised, so
    /// voluntarily-queued writes are not silently dropped.
    pub fn done(&mut self) {
        self.push(Command::Done);
    }
}

/// The readiness-driven event dispatcher.
///
/// A `Reactor` owns three [`DispatchSet`]s — input, output and error —
/// plus an ordered list of idle callbacks and a done flag. Each call
/// to [`process`](Reactor::process) runs one cycle:
///
/// 1. prune entries whose descriptor died in a previous cycle,
/// 2. ask every set which descriptors currently want readiness,
/// 3. wait once in the OS readiness primitive (skipped entirely when
///    all three candidate lists are empty),
/// 4. dispatch in the fixed order **error, output, input**,
/// 5. apply registrations queued by participants during dispatch,
/// 6. run idle callbacks in registration order.
///
/// Scheduling is strictly single-threaded and cooperative; the wait
/// in step 3 is the only suspension point.
pub struct Reactor {
    inputs: DispatchSet<dyn Source>,
    outputs: DispatchSet<dyn Sink>,
    errs: DispatchSet<dyn Sink>,
    idlers: Vec<(IdlerToken, Box<dyn FnMut()>)>,
    next_idler: usize,
    done: bool,
}

impl Reactor {
    /// Creates a reactor with empty dispatch sets.
    pub fn new() -> Self {
        Self {
            inputs: DispatchSet::new(),
            outputs: DispatchSet::new(),
            errs: DispatchSet::new(),
            idlers: Vec::new(),
            next_idler: 0,
            done: false,
        }
    }

    /// Registers a source in the input set.
    pub fn add_input(&mut self, source: impl Source + 'static) {
        debug!(fd = source.fd(), "registering input");
        self.inputs.add(Box::new(source));
    }

    /// Removes the input participant keyed on `fd`.
    pub fn del_input(&mut self, fd: RawFd) {
        self.inputs.delete(fd);
    }

    /// Registers a sink in the output set.
    pub fn add_output(&mut self, sink: impl Sink + 'static) {
        debug!(fd = sink.fd(), "registering output");
        self.outputs.add(Box::new(sink));
    }

    /// Removes the output participant keyed on `fd`.
    pub fn del_output(&mut self, fd: RawFd) {
        self.outputs.delete(fd);
    }

    /// Registers a sink in the error set.
    pub fn add_err(&mut self, sink: impl Sink + 'static) {
        debug!(fd = sink.fd(), "registering error watcher");
        self.errs.add(Box::new(sink));
    }

    /// Removes the error participant keyed on `fd`.
    pub fn del_err(&mut self, fd: RawFd) {
        self.errs.delete(fd);
    }

    /// Removes `fd` from every set.
    pub fn remove(&mut self, fd: RawFd) {
        self.inputs.delete(fd);
        self.outputs.delete(fd);
        self.errs.delete(fd);
    }

    /// Registers a [`Listener`] accepting connections on `fd`.
    ///
    /// The descriptor is switched to non-blocking mode. The accept
    /// callback produces the source/sink pair to register for each
    /// new connection.
    pub fn add_listener(&mut self, fd: RawFd, accept: impl AcceptFn + 'static) -> io::Result<()> {
        let listener = Listener::new(fd, accept)?;
        self.add_input(listener);
        Ok(())
    }

    /// Registers an idle callback, run once per cycle after dispatch.
    ///
    /// Idle callbacks are the only place work not triggered by I/O
    /// readiness runs. They execute in registration order.
    pub fn add_idler(&mut self, callback: impl FnMut() + 'static) -> IdlerToken {
        let token = IdlerToken(self.next_idler);
        self.next_idler += 1;
        self.idlers.push((token, Box::new(callback)));
        token
    }

    /// Removes a previously registered idle callback.
    pub fn del_idler(&mut self, token: IdlerToken) {
        self.idlers.retain(|(t, _)| *t != token);
    }

    /// Runs one reactor cycle.
    ///
    /// `timeout` bounds how long the cycle may block in the readiness
    /// wait; `None` means unbounded — except when idle callbacks are
    /// registered, in which case the wait is clamped to a one-second
    /// tick so the callbacks keep their once-per-cycle cadence. When
    /// all three candidate lists are empty the wait is skipped
    /// entirely (idle callbacks still run).
    pub fn process(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.inputs.cleanup_closed();
        self.outputs.cleanup_closed();
        self.errs.cleanup_closed();

        let read = self.inputs.needs_processing();
        let write = self.outputs.needs_processing();
        let err = self.errs.needs_processing();

        if !(read.is_empty() && write.is_empty() && err.is_empty()) {
            let timeout = match timeout {
                None if !self.idlers.is_empty() => Some(IDLE_TICK),
                other => other,
            };

            trace!(
                inputs = read.len(),
                outputs = write.len(),
                errs = err.len(),
                "waiting for readiness"
            );

            let ready = sys::sys_wait(&read, &write, &err, timeout).map_err(Error::Wait)?;

            trace!(
                readable = ready.read.len(),
                writable = ready.write.len(),
                erroring = ready.err.len(),
                "dispatching"
            );

            self.dispatch(&ready.err, &ready.write, &ready.read)?;
        }

        for (_, idler) in &mut self.idlers {
            idler();
        }

        Ok(())
    }

    /// Pushes out pending buffered writes without touching inputs.
    ///
    /// Runs a zero-timeout readiness check restricted to the output
    /// and error sets and dispatches whatever is ready. Used to drain
    /// final output before a controlled shutdown without risking an
    /// indefinite block on input.
    pub fn flush(&mut self) -> Result<()> {
        let write = self.outputs.needs_processing();
        let err = self.errs.needs_processing();

        if write.is_empty() && err.is_empty() {
            return Ok(());
        }

        let ready =
            sys::sys_wait(&[], &write, &err, Some(Duration::ZERO)).map_err(Error::Wait)?;

        self.dispatch(&ready.err, &ready.write, &[])
    }

    /// Flushes pending output, then raises the done flag.
    pub fn done(&mut self) -> Result<()> {
        self.flush()?;
        self.done = true;
        Ok(())
    }

    /// Whether the done flag is raised.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Runs [`process`](Reactor::process) until the done flag is
    /// raised.
    ///
    /// The flag is reset first, so a finished reactor can be served
    /// again.
    pub fn serve(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.done = false;
        while !self.done {
            self.process(timeout)?;
        }
        Ok(())
    }

    /// Like [`serve`](Reactor::serve), with a callback invoked after
    /// every cycle.
    pub fn serve_with(
        &mut self,
        timeout: Option<Duration>,
        mut per_cycle: impl FnMut(&mut Self),
    ) -> Result<()> {
        self.done = false;
        while !self.done {
            self.process(timeout)?;
            per_cycle(self);
        }
        Ok(())
    }

    /// Dispatches the three sets in the fixed error/output/input
    /// order, then applies queued commands.
    ///
    /// Errors drain first so a broken handle is not fed more output;
    /// output drains before input so an input handler that triggers
    /// more output cannot starve already-queued writes. Commands are
    /// applied even when a participant failed, so registrations that
    /// happened before the failure are not lost.
    fn dispatch(&mut self, err: &[RawFd], write: &[RawFd], read: &[RawFd]) -> Result<()> {
        let mut commands = Vec::new();

        let result = (|| -> io::Result<()> {
            let mut scope = Scope::new(&mut commands);
            self.errs.process(err, &mut scope)?;
            self.outputs.process(write, &mut scope)?;
            self.inputs.process(read, &mut scope)
        })();

        let done_requested = self.apply(commands);
        result.map_err(Error::Dispatch)?;

        if done_requested {
            self.done()?;
        }

        Ok(())
    }

    fn apply(&mut self, commands: Vec<Command>) -> bool {
        let mut done_requested = false;

        for command in commands {
            match command {
                Command::AddInput(source) => {
                    debug!(fd = source.fd(), "registering input");
                    self.inputs.add(source);
                }
                Command::AddOutput(sink) => {
                    debug!(fd = sink.fd(), "registering output");
                    self.outputs.add(sink);
                }
                Command::AddErr(sink) => {
                    debug!(fd = sink.fd(), "registering error watcher");
                    self.errs.add(sink);
                }
                Command::DelInput(fd) => {
                    self.inputs.delete(fd);
                }
                Command::DelOutput(fd) => {
                    self.outputs.delete(fd);
                }
                Command::DelErr(fd) => {
                    self.errs.delete(fd);
                }
                Command::Remove(fd) => {
                    self.inputs.delete(fd);
                    self.outputs.delete(fd);
                    self.errs.delete(fd);
                }
                Command::Done => done_requested = true,
            }
        }

        done_requested
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}
