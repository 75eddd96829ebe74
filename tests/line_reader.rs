#[cfg(test)]
mod tests {
    use spindle::{LineEvent, LineReader, Port, Reactor};

    use std::cell::RefCell;
    use std::io::Write;
    use std::os::fd::IntoRawFd;
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;
    use std::time::Duration;

    fn reader_over_pair() -> (Port, UnixStream) {
        let (local, peer) = UnixStream::pair().expect("Failed to create socket pair");
        local
            .set_nonblocking(true)
            .expect("Failed to set non-blocking");
        (Port::new(local.into_raw_fd()), peer)
    }

    #[test]
    fn test_lines_are_delivered_separator_included() {
        let (port, mut peer) = reader_over_pair();
        let lines = Rc::new(RefCell::new(Vec::new()));

        let mut reactor = Reactor::new();
        let seen = lines.clone();
        reactor.add_input(LineReader::new(port, move |_scope, event| {
            seen.borrow_mut().push(event);
            Ok(())
        }));

        peer.write_all(b"alpha\nbeta\ngam").expect("Failed to write");
        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");

        assert_eq!(
            *lines.borrow(),
            vec![
                LineEvent::Line(b"alpha\n".to_vec()),
                LineEvent::Line(b"beta\n".to_vec()),
            ]
        );

        // The partial line stays buffered until its separator shows up.
        peer.write_all(b"ma\n").expect("Failed to write");
        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");

        assert_eq!(lines.borrow().len(), 3);
        assert_eq!(
            lines.borrow()[2],
            LineEvent::Line(b"gamma\n".to_vec())
        );
    }

    #[test]
    fn test_trailing_partial_line_then_eof() {
        let (port, mut peer) = reader_over_pair();
        let lines = Rc::new(RefCell::new(Vec::new()));

        let mut reactor = Reactor::new();
        let seen = lines.clone();
        reactor.add_input(LineReader::new(port, move |_scope, event| {
            seen.borrow_mut().push(event);
            Ok(())
        }));

        peer.write_all(b"finale").expect("Failed to write");
        drop(peer);

        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");

        assert_eq!(
            *lines.borrow(),
            vec![LineEvent::Line(b"finale".to_vec()), LineEvent::Eof]
        );

        // End of stream reached: the reader stops asking for readiness,
        // so an empty reactor cycle returns immediately.
        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");
        assert_eq!(lines.borrow().len(), 2);
    }

    #[test]
    fn test_custom_separator() {
        let (port, mut peer) = reader_over_pair();
        let lines = Rc::new(RefCell::new(Vec::new()));

        let mut reactor = Reactor::new();
        let seen = lines.clone();
        reactor.add_input(LineReader::with_separator(port, b';', move |_scope, event| {
            seen.borrow_mut().push(event);
            Ok(())
        }));

        peer.write_all(b"one;two;").expect("Failed to write");
        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");

        assert_eq!(
            *lines.borrow(),
            vec![
                LineEvent::Line(b"one;".to_vec()),
                LineEvent::Line(b"two;".to_vec()),
            ]
        );
    }
}
