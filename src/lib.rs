//! # Spindle
//!
//! **Spindle** is a single-threaded, readiness-driven I/O reactor: a
//! cooperative event dispatcher built directly on the OS "wait for
//! any of these descriptors to become ready" primitive.
//!
//! The reactor owns three registries — input, output, and error —
//! mapping raw descriptors to participants. Each cycle it prunes dead
//! entries, asks every participant whether it currently wants
//! attention, waits once in the OS, and dispatches readiness in a
//! fixed order: errors first (so a broken handle is not fed more
//! output), then output (so input handlers cannot starve queued
//! writes), then input, then idle callbacks.
//!
//! On top of the dispatch core sit the stock participants:
//!
//! - [`BasicInput`] / [`BasicOutput`] adapt a plain callback so any
//!   descriptor can join the loop without a new type
//! - [`QueuedOutput`] buffers outbound data, performs partial
//!   non-blocking writes, requeues unwritten remainders in order, and
//!   supports close-after-drain
//! - [`Listener`] accepts one connection per readiness notification
//!   and lets a callback decide what to register for it
//! - [`SocketConnector`] drives a non-blocking outbound connect to
//!   completion
//! - [`LineReader`] buffers reads and delivers complete lines
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spindle::{BasicInput, Port, QueuedOutput, Reactor};
//! use std::cell::RefCell;
//! use std::os::fd::IntoRawFd;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let mut reactor = Reactor::new();
//!
//! let listener = std::net::TcpListener::bind("127.0.0.1:7000").unwrap();
//! reactor.add_listener(listener.into_raw_fd(), |port: Port| {
//!     // Echo: wire a reader that feeds a queued writer on the
//!     // same connection.
//!     let output = Rc::new(RefCell::new(QueuedOutput::new(port.clone())));
//!     let writer = output.clone();
//!     let input = BasicInput::new(port.clone(), move |_scope| {
//!         let mut buf = [0u8; 4096];
//!         match spindle::nonblock::read(port.fd(), &mut buf)? {
//!             spindle::nonblock::ReadOutcome::Data(n) => {
//!                 writer.borrow_mut().write(&buf[..n]);
//!             }
//!             spindle::nonblock::ReadOutcome::Eof => writer.borrow_mut().close(),
//!             spindle::nonblock::ReadOutcome::WouldBlock => {}
//!         }
//!         Ok(())
//!     });
//!     Ok((Some(Box::new(input)), Some(Box::new(output))))
//! }).unwrap();
//!
//! reactor.serve(Some(Duration::from_secs(60))).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`reactor`] — the dispatch core and stock participants
//! - [`nonblock`] — non-blocking I/O with explicit tagged outcomes
//! - [`error`] — the loop-boundary error type
//!
//! Spindle is unix-only and deliberately single-threaded: the wait
//! primitive is the sole suspension point, every `process` callback
//! is expected to return promptly, and no synchronization is needed
//! anywhere.

pub mod error;
pub mod nonblock;
pub mod reactor;

mod sys;

pub use error::{Error, Result};
pub use reactor::{
    AcceptFn, BasicInput, BasicOutput, DispatchSet, IdlerToken, LineEvent, LineReader, Listener,
    Participant, Port, QueuedOutput, Reactor, Scope, Sink, SocketConnector, Source, WriteFn,
};
