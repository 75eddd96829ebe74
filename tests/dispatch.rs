#[cfg(test)]
mod tests {
    use spindle::{BasicInput, BasicOutput, DispatchSet, Port, Reactor, Source};

    use std::cell::RefCell;
    use std::io::Write;
    use std::os::fd::IntoRawFd;
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;
    use std::time::Duration;

    fn nonblocking_pair() -> (UnixStream, UnixStream) {
        let (a, b) = UnixStream::pair().expect("Failed to create socket pair");
        a.set_nonblocking(true).expect("Failed to set non-blocking");
        b.set_nonblocking(true).expect("Failed to set non-blocking");
        (a, b)
    }

    #[test]
    fn test_membership_follows_eligibility() {
        let (local, _peer) = nonblocking_pair();
        let fd = local.into_raw_fd();
        let port = Port::new(fd);

        let mut set: DispatchSet<dyn Source> = DispatchSet::new();
        assert!(set.is_empty());

        set.add(Box::new(BasicInput::new(port.clone(), |_| Ok(()))));
        assert!(set.contains(fd));
        assert_eq!(set.needs_processing(), vec![fd]);

        set.delete(fd);
        assert!(!set.contains(fd));
        assert!(set.needs_processing().is_empty());
    }

    #[test]
    fn test_closed_handles_are_pruned() {
        let (local, _peer) = nonblocking_pair();
        let fd = local.into_raw_fd();
        let port = Port::new(fd);

        let mut set: DispatchSet<dyn Source> = DispatchSet::new();
        set.add(Box::new(BasicInput::new(port.clone(), |_| Ok(()))));
        assert_eq!(set.len(), 1);

        port.close();
        assert!(set.needs_processing().is_empty());

        set.cleanup_closed();
        assert!(!set.contains(fd));
        assert!(set.is_empty());
    }

    #[test]
    fn test_readding_replaces_prior_mapping() {
        let (local, _peer) = nonblocking_pair();
        let fd = local.into_raw_fd();
        let port = Port::new(fd);

        let mut set: DispatchSet<dyn Source> = DispatchSet::new();
        set.add(Box::new(BasicInput::new(port.clone(), |_| Ok(()))));
        set.add(Box::new(BasicInput::new(port.clone(), |_| Ok(()))));

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_dispatch_order_err_then_output_then_input() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut reactor = Reactor::new();

        // Error member: a socket whose peer is already gone.
        let (err_local, err_peer) = nonblocking_pair();
        drop(err_peer);
        let err_port = Port::new(err_local.into_raw_fd());
        let seen = order.clone();
        reactor.add_err(BasicOutput::new(
            err_port,
            || true,
            move |_| {
                seen.borrow_mut().push("err");
                Ok(())
            },
        ));

        // Output member: a healthy socket, writable immediately.
        let (out_local, _out_peer) = nonblocking_pair();
        let out_port = Port::new(out_local.into_raw_fd());
        let seen = order.clone();
        reactor.add_output(BasicOutput::new(
            out_port,
            || true,
            move |_| {
                seen.borrow_mut().push("out");
                Ok(())
            },
        ));

        // Input member: data already pending.
        let (in_local, mut in_peer) = nonblocking_pair();
        in_peer.write_all(b"x").expect("Failed to write");
        let in_port = Port::new(in_local.into_raw_fd());
        let seen = order.clone();
        reactor.add_input(BasicInput::new(in_port, move |_| {
            seen.borrow_mut().push("in");
            Ok(())
        }));

        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");

        assert_eq!(*order.borrow(), vec!["err", "out", "in"]);
    }

    #[test]
    fn test_participant_can_deregister_itself() {
        let (local, mut peer) = nonblocking_pair();
        peer.write_all(b"x").expect("Failed to write");

        let fd = local.into_raw_fd();
        let port = Port::new(fd);
        let hits = Rc::new(RefCell::new(0));

        let mut reactor = Reactor::new();
        let counter = hits.clone();
        reactor.add_input(BasicInput::new(port, move |scope| {
            *counter.borrow_mut() += 1;
            scope.del_input(fd);
            Ok(())
        }));

        reactor
            .process(Some(Duration::from_secs(1)))
            .expect("Failed to process");
        assert_eq!(*hits.borrow(), 1);

        // More data arrives, but the participant is gone.
        peer.write_all(b"y").expect("Failed to write");
        reactor
            .process(Some(Duration::from_millis(20)))
            .expect("Failed to process");
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_callback_error_stops_the_loop() {
        let (local, mut peer) = nonblocking_pair();
        peer.write_all(b"x").expect("Failed to write");

        let port = Port::new(local.into_raw_fd());
        let mut reactor = Reactor::new();
        reactor.add_input(BasicInput::new(port, |_| {
            Err(std::io::Error::other("participant blew up"))
        }));

        let result = reactor.process(Some(Duration::from_secs(1)));
        assert!(matches!(result, Err(spindle::Error::Dispatch(_))));
    }
}
