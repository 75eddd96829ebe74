//! The readiness-driven dispatch core.
//!
//! This module implements the event loop and its participants:
//! - [`Reactor`] / [`Scope`]: the cycle driver and the registration
//!   context passed into every dispatch
//! - [`DispatchSet`]: the fd-keyed participant registries
//! - [`Port`]: shared ownership of one OS stream handle
//! - [`Participant`] / [`Source`] / [`Sink`]: the capability traits
//! - [`BasicInput`] / [`BasicOutput`]: callback adapters for ad-hoc
//!   descriptors
//! - [`QueuedOutput`]: the backpressure-aware buffered writer
//! - [`Listener`]: the connection-accept source
//! - [`SocketConnector`]: the non-blocking outbound-connect state
//!   machine
//! - [`LineReader`]: a buffered line-splitting source

mod basic;
mod connector;
mod core;
mod dispatch_set;
mod line_reader;
mod listener;
mod participant;
mod port;
mod queued_output;

pub use basic::{BasicInput, BasicOutput};
pub use connector::SocketConnector;
pub use core::{IdlerToken, Reactor, Scope};
pub use dispatch_set::DispatchSet;
pub use line_reader::{LineEvent, LineReader};
pub use listener::{AcceptFn, Listener};
pub use participant::{Participant, Sink, Source};
pub use port::Port;
pub use queued_output::{QueuedOutput, WriteFn};
