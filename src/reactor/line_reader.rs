use super::core::Scope;
use super::participant::{Participant, Source};
use super::port::Port;
use crate::nonblock::{self, ReadOutcome};

use std::io;
use std::os::fd::RawFd;

const DEFAULT_READ_SIZE: usize = 8192;

/// A record produced by a [`LineReader`].
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// One line, separator included. The final line before end of
    /// stream may lack the separator.
    Line(Vec<u8>),

    /// End of stream; emitted once, after any trailing partial line.
    Eof,
}

/// A buffered line-splitting [`Source`].
///
/// On each readiness notification the reader drains the descriptor
/// with non-blocking reads, appends to an internal buffer, and
/// invokes the callback once per complete line. When the peer ends
/// the stream, any trailing partial line is delivered, followed by a
/// single [`LineEvent::Eof`], after which the reader stops asking for
/// readiness.
pub struct LineReader {
    port: Port,
    separator: u8,
    buffer: Vec<u8>,
    read_size: usize,
    eof: bool,
    callback: Box<dyn FnMut(&mut Scope<'_>, LineEvent) -> io::Result<()>>,
}

impl LineReader {
    /// A reader splitting on `\n`.
    pub fn new(
        port: Port,
        callback: impl FnMut(&mut Scope<'_>, LineEvent) -> io::Result<()> + 'static,
    ) -> Self {
        Self::with_separator(port, b'\n', callback)
    }

    /// A reader splitting on an arbitrary separator byte.
    pub fn with_separator(
        port: Port,
        separator: u8,
        callback: impl FnMut(&mut Scope<'_>, LineEvent) -> io::Result<()> + 'static,
    ) -> Self {
        Self {
            port,
            separator,
            buffer: Vec::new(),
            read_size: DEFAULT_READ_SIZE,
            eof: false,
            callback: Box::new(callback),
        }
    }

    /// Overrides the per-cycle read chunk size.
    pub fn read_size(mut self, size: usize) -> Self {
        self.read_size = size.max(1);
        self
    }

    /// Takes whatever is buffered but not yet delivered as a line.
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = vec![0u8; self.read_size];

        loop {
            match nonblock::read(self.port.fd(), &mut chunk)? {
                ReadOutcome::Data(n) => self.buffer.extend_from_slice(&chunk[..n]),
                ReadOutcome::WouldBlock => break,
                ReadOutcome::Eof => {
                    self.eof = true;
                    break;
                }
            }
        }

        Ok(())
    }

    fn deliver(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        while let Some(idx) = self.buffer.iter().position(|&b| b == self.separator) {
            let line: Vec<u8> = self.buffer.drain(..=idx).collect();
            (self.callback)(scope, LineEvent::Line(line))?;
        }

        if self.eof {
            if !self.buffer.is_empty() {
                let rest = std::mem::take(&mut self.buffer);
                (self.callback)(scope, LineEvent::Line(rest))?;
            }
            (self.callback)(scope, LineEvent::Eof)?;
        }

        Ok(())
    }
}

impl Participant for LineReader {
    fn fd(&self) -> RawFd {
        self.port.fd()
    }

    fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    fn needs_processing(&self) -> bool {
        !self.eof && !self.port.is_closed()
    }

    fn process(&mut self, scope: &mut Scope<'_>) -> io::Result<()> {
        self.fill()?;
        self.deliver(scope)
    }
}

impl Source for LineReader {}
