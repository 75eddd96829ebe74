use libc::{
    AF_INET, AF_INET6, F_GETFL, F_SETFL, O_NONBLOCK, POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT,
    POLLPRI, SOCK_STREAM, accept, close, connect, fcntl, getsockname, nfds_t, poll, pollfd, read,
    sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socket, socklen_t, write,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::RawFd;
use std::time::Duration;
use std::{io, mem};

/// Readiness facts returned by [`sys_wait`].
///
/// Each list contains the file descriptors from the corresponding
/// request list that are currently able to perform the operation
/// without blocking.
pub(crate) struct Ready {
    /// Descriptors ready for reading.
    pub(crate) read: Vec<RawFd>,

    /// Descriptors ready for writing.
    pub(crate) write: Vec<RawFd>,

    /// Descriptors with a pending error or exceptional condition.
    pub(crate) err: Vec<RawFd>,
}

impl Ready {
    fn empty() -> Self {
        Self {
            read: Vec::new(),
            write: Vec::new(),
            err: Vec::new(),
        }
    }
}

/// Waits for readiness on up to three descriptor lists.
///
/// This is the reactor's single suspension point. A descriptor may
/// appear in more than one request list; the entries are merged into
/// one `pollfd` and demultiplexed back into per-list results.
///
/// `None` blocks indefinitely. An interrupted wait (`EINTR`) is
/// reported as an empty result rather than an error, so the caller
/// simply runs an empty cycle and waits again.
pub(crate) fn sys_wait(
    read_fds: &[RawFd],
    write_fds: &[RawFd],
    err_fds: &[RawFd],
    timeout: Option<Duration>,
) -> io::Result<Ready> {
    let mut fds: Vec<pollfd> = Vec::with_capacity(read_fds.len() + write_fds.len() + err_fds.len());

    let mut request = |fd: RawFd, events: i16| {
        if let Some(entry) = fds.iter_mut().find(|entry| entry.fd == fd) {
            entry.events |= events;
        } else {
            fds.push(pollfd {
                fd,
                events,
                revents: 0,
            });
        }
    };

    for &fd in read_fds {
        request(fd, POLLIN);
    }
    for &fd in write_fds {
        request(fd, POLLOUT);
    }
    for &fd in err_fds {
        request(fd, POLLPRI);
    }

    let timeout_ms = timeout
        .map(|t| t.as_millis().min(i32::MAX as u128) as i32)
        .unwrap_or(-1);

    let n = unsafe { poll(fds.as_mut_ptr(), fds.len() as nfds_t, timeout_ms) };

    if n < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Ready::empty());
        }
        return Err(err);
    }

    let mut ready = Ready::empty();

    for entry in &fds {
        if entry.revents == 0 {
            continue;
        }

        // Hang-ups and errors are delivered to whichever lists asked
        // about this descriptor, so the owning participant gets a
        // chance to observe the failure and close the handle.
        let broken = entry.revents & (POLLERR | POLLHUP | POLLNVAL) != 0;

        if entry.events & POLLIN != 0 && (entry.revents & POLLIN != 0 || broken) {
            ready.read.push(entry.fd);
        }
        if entry.events & POLLOUT != 0 && (entry.revents & POLLOUT != 0 || broken) {
            ready.write.push(entry.fd);
        }
        if entry.events & POLLPRI != 0 && (entry.revents & POLLPRI != 0 || broken) {
            ready.err.push(entry.fd);
        }
    }

    Ok(ready)
}

/// Reads from a file descriptor into the given buffer.
///
/// Returns the number of bytes read, or a negative value on error.
/// The file descriptor **must** be non-blocking.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) }
}

/// Writes the buffer to a file descriptor.
///
/// Returns the number of bytes written, or a negative value on error.
/// The file descriptor **must** be non-blocking.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> isize {
    unsafe { write(fd, buffer.as_ptr() as *const _, buffer.len()) }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Sets a file descriptor to non-blocking mode.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Creates a non-blocking stream socket for the given address family.
pub(crate) fn sys_socket(domain: libc::c_int) -> io::Result<RawFd> {
    let fd = unsafe { socket(domain, SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    if let Err(e) = sys_set_nonblocking(fd) {
        unsafe { close(fd) };
        return Err(e);
    }

    Ok(fd)
}

/// Accepts a new incoming connection.
///
/// The returned client socket is automatically set to non-blocking
/// mode. Errors, including "would block", are returned raw; the
/// caller decodes them.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client_fd = unsafe { accept(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) };

    if client_fd < 0 {
        return Err(io::Error::last_os_error());
    }

    if let Err(e) = sys_set_nonblocking(client_fd) {
        unsafe { close(client_fd) };
        return Err(e);
    }

    let addr = sockaddr_storage_to_socketaddr(&storage)?;

    Ok((client_fd, addr))
}

/// Initiates (or re-checks) a non-blocking connection.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);

    let rc = unsafe { connect(fd, &storage as *const _ as *const sockaddr, len) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let rc = unsafe { getsockname(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        sockaddr_storage_to_socketaddr(&storage)
    }
}

/// Converts a `sockaddr_storage` to a Rust `SocketAddr`.
pub(crate) fn sockaddr_storage_to_socketaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as libc::c_int {
        AF_INET => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            let port = u16::from_be(addr.sin_port);

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }

        AF_INET6 => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}

/// Converts a `SocketAddr` to a `sockaddr_storage`.
pub(crate) fn socketaddr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sa.sin_family = AF_INET as _;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<sockaddr_in>() as socklen_t)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sa.sin6_family = AF_INET6 as _;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<sockaddr_in6>() as socklen_t)
        }
    }
}

/// Returns the address family constant for a socket address.
pub(crate) fn sys_domain(addr: &SocketAddr) -> libc::c_int {
    match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    }
}
