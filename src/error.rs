use std::io;
use thiserror::Error;

/// Errors surfaced by the reactor loop.
///
/// Participant callbacks and non-blocking helpers work in plain
/// [`io::Result`]; this type only appears at the loop boundary, where
/// it distinguishes a failure of the readiness-wait primitive from a
/// participant that failed during dispatch. Neither is swallowed: an
/// error from [`crate::Reactor::process`] or [`crate::Reactor::serve`]
/// stops the loop.
#[derive(Debug, Error)]
pub enum Error {
    /// The OS readiness-wait primitive failed.
    #[error("readiness wait failed: {0}")]
    Wait(#[source] io::Error),

    /// A participant returned an error from its `process` call.
    #[error("participant failed during dispatch: {0}")]
    Dispatch(#[source] io::Error),
}

/// Result alias for reactor loop operations.
pub type Result<T> = std::result::Result<T, Error>;
