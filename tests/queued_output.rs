#[cfg(test)]
mod tests {
    use spindle::nonblock::WriteOutcome;
    use spindle::{Participant, Port, QueuedOutput, Reactor};

    use std::cell::RefCell;
    use std::io;
    use std::os::fd::IntoRawFd;
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;
    use std::time::Duration;

    fn writable_port() -> (Port, UnixStream) {
        let (local, peer) = UnixStream::pair().expect("Failed to create socket pair");
        local
            .set_nonblocking(true)
            .expect("Failed to set non-blocking");
        (Port::new(local.into_raw_fd()), peer)
    }

    /// A queued writer over a sink that accepts at most `cap` bytes
    /// per attempt, recording everything it accepts.
    fn capped_writer(
        port: Port,
        cap: usize,
        observed: Rc<RefCell<Vec<u8>>>,
    ) -> QueuedOutput {
        QueuedOutput::with_writer(port, move |buffer| {
            let n = buffer.len().min(cap);
            observed.borrow_mut().extend_from_slice(&buffer[..n]);
            Ok(WriteOutcome::Wrote(n))
        })
    }

    fn drain(reactor: &mut Reactor, output: &Rc<RefCell<QueuedOutput>>, max_cycles: usize) {
        for _ in 0..max_cycles {
            if output.borrow().pending() == 0 {
                return;
            }
            reactor
                .process(Some(Duration::from_secs(1)))
                .expect("Failed to process");
        }
        panic!("Queue did not drain within {max_cycles} cycles");
    }

    #[test]
    fn test_writes_preserve_order_across_partial_drains() {
        let (port, _peer) = writable_port();
        let observed = Rc::new(RefCell::new(Vec::new()));

        let output = Rc::new(RefCell::new(capped_writer(port, 7, observed.clone())));
        output.borrow_mut().write(b"the quick ");
        output.borrow_mut().write(b"brown fox ");
        output.borrow_mut().write(b"jumps over the lazy dog");

        let mut reactor = Reactor::new();
        reactor.add_output(output.clone());

        drain(&mut reactor, &output, 100);

        assert_eq!(
            observed.borrow().as_slice(),
            b"the quick brown fox jumps over the lazy dog"
        );
    }

    #[test]
    fn test_backpressure_drains_a_megabyte_through_a_small_window() {
        let (port, _peer) = writable_port();
        let observed = Rc::new(RefCell::new(Vec::new()));

        let payload: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();

        let output = Rc::new(RefCell::new(capped_writer(port, 4096, observed.clone())));
        assert_eq!(output.borrow_mut().write(&payload), payload.len());
        assert!(output.borrow().needs_processing());

        let mut reactor = Reactor::new();
        reactor.add_output(output.clone());

        drain(&mut reactor, &output, 300);

        assert!(!output.borrow().needs_processing());
        assert_eq!(observed.borrow().len(), 1_000_000);
        assert_eq!(*observed.borrow(), payload);
    }

    #[test]
    fn test_would_block_requeues_without_error() {
        let (port, _peer) = writable_port();
        let observed = Rc::new(RefCell::new(Vec::new()));
        let blocked = Rc::new(RefCell::new(true));

        let gate = blocked.clone();
        let sink = observed.clone();
        let output = Rc::new(RefCell::new(QueuedOutput::with_writer(
            port,
            move |buffer| {
                if *gate.borrow() {
                    Ok(WriteOutcome::WouldBlock)
                } else {
                    sink.borrow_mut().extend_from_slice(buffer);
                    Ok(WriteOutcome::Wrote(buffer.len()))
                }
            },
        )));
        output.borrow_mut().write(b"held back");

        let mut reactor = Reactor::new();
        reactor.add_output(output.clone());

        // Destination refuses; the buffer stays queued, no error.
        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");
        assert_eq!(output.borrow().pending(), 9);
        assert!(observed.borrow().is_empty());

        *blocked.borrow_mut() = false;
        drain(&mut reactor, &output, 10);
        assert_eq!(observed.borrow().as_slice(), b"held back");
    }

    #[test]
    fn test_close_after_drain() {
        let (port, _peer) = writable_port();
        let observed = Rc::new(RefCell::new(Vec::new()));

        let output = Rc::new(RefCell::new(capped_writer(
            port.clone(),
            4,
            observed.clone(),
        )));
        output.borrow_mut().write(b"goodbye");
        output.borrow_mut().close();

        // Data still queued: the handle must stay open.
        assert!(!port.is_closed());

        let mut reactor = Reactor::new();
        reactor.add_output(output.clone());
        drain(&mut reactor, &output, 10);

        assert_eq!(observed.borrow().as_slice(), b"goodbye");
        assert!(port.is_closed());
    }

    #[test]
    fn test_close_with_empty_queue_is_immediate() {
        let (port, _peer) = writable_port();
        let mut output = QueuedOutput::new(port.clone());
        output.close();
        assert!(port.is_closed());
        assert!(!output.needs_processing());
    }

    #[test]
    fn test_fatal_write_error_closes_the_handle() {
        let (port, _peer) = writable_port();

        let output = Rc::new(RefCell::new(QueuedOutput::with_writer(
            port.clone(),
            |_| Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        )));
        output.borrow_mut().write(b"doomed");

        let mut reactor = Reactor::new();
        reactor.add_output(output.clone());

        // The failure is absorbed internally, not surfaced.
        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");

        assert!(port.is_closed());
        assert_eq!(output.borrow().pending(), 0);
        assert!(!output.borrow().needs_processing());
    }

    #[test]
    fn test_default_writer_reaches_the_peer() {
        use std::io::Read;

        let (local, mut peer) = UnixStream::pair().expect("Failed to create socket pair");
        local
            .set_nonblocking(true)
            .expect("Failed to set non-blocking");
        let port = Port::new(local.into_raw_fd());

        let output = Rc::new(RefCell::new(QueuedOutput::new(port)));
        output.borrow_mut().write(b"over the wire");

        let mut reactor = Reactor::new();
        reactor.add_output(output.clone());
        drain(&mut reactor, &output, 10);

        let mut buffer = [0u8; 13];
        peer.read_exact(&mut buffer).expect("Failed to read");
        assert_eq!(&buffer, b"over the wire");
    }
}
