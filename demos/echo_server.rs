//! Demo: line-oriented TCP echo server on a single-threaded reactor.
//!
//! Run with `cargo run --example echo_server`, then try
//! `nc 127.0.0.1 7000` from another terminal.

use spindle::{LineEvent, LineReader, Port, QueuedOutput, Reactor, Sink, Source};

use std::cell::RefCell;
use std::net::TcpListener;
use std::os::fd::IntoRawFd;
use std::rc::Rc;
use std::time::Duration;

fn wire_connection(port: Port) -> std::io::Result<(Option<Box<dyn Source>>, Option<Box<dyn Sink>>)> {
    let output = Rc::new(RefCell::new(QueuedOutput::new(port.clone())));

    let writer = output.clone();
    let input = LineReader::new(port, move |_scope, event| {
        match event {
            LineEvent::Line(line) => {
                writer.borrow_mut().push(line);
            }
            LineEvent::Eof => {
                writer.borrow_mut().close();
            }
        }
        Ok(())
    });

    Ok((Some(Box::new(input)), Some(Box::new(output))))
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let listener = TcpListener::bind("127.0.0.1:7000")?;
    println!("Echo server listening on 127.0.0.1:7000");

    let mut reactor = Reactor::new();
    reactor.add_listener(listener.into_raw_fd(), wire_connection)?;

    reactor
        .serve(Some(Duration::from_secs(60)))
        .map_err(|err| std::io::Error::other(err.to_string()))
}
