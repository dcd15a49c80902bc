use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};
#[cfg(unix)]
use std::os::fd::AsRawFd;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, info};

use crate::error::{Result, SocketError};
use crate::stream::PointToPoint;
use crate::YIELD_INTERVAL;

/// Pending-connection queue depth requested for every listener.
const LISTEN_BACKLOG: libc::c_int = 100;

/// A passive (listening) socket: TCP on an IPv4 port or Unix-domain at a
/// filesystem path.
///
/// The listener runs non-blocking; [`ServerSocket::accept`] polls
/// cooperatively under the caller's keep-going predicate. The Unix-domain
/// variant owns its socket path and unlinks it on close or drop.
pub struct ServerSocket {
    inner: Option<ListenerInner>,
    path: Option<PathBuf>,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl ServerSocket {
    /// Bind and listen on an IPv4 TCP port (all interfaces).
    pub fn bind_tcp(port: u16) -> Result<Self> {
        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        let listener = TcpListener::bind(addr).map_err(|source| SocketError::PassivePrepare {
            op: "bind",
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| SocketError::PassivePrepare {
                op: "set non-blocking mode",
                source,
            })?;
        #[cfg(unix)]
        pin_backlog(listener.as_raw_fd())?;

        info!(port, "listening on tcp socket");
        Ok(Self {
            inner: Some(ListenerInner::Tcp(listener)),
            path: None,
        })
    }

    /// Bind and listen on a Unix-domain socket path.
    ///
    /// A leftover socket file at `path` is removed first; any other kind of
    /// file at that path is an error.
    #[cfg(unix)]
    pub fn bind_unix(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let metadata =
                std::fs::symlink_metadata(&path).map_err(|source| SocketError::PassivePrepare {
                    op: "inspect socket path",
                    source,
                })?;
            if !metadata.file_type().is_socket() {
                return Err(SocketError::PassivePrepare {
                    op: "bind",
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|source| SocketError::PassivePrepare {
                op: "remove stale socket",
                source,
            })?;
        }

        let listener =
            UnixListener::bind(&path).map_err(|source| SocketError::PassivePrepare {
                op: "bind",
                source,
            })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| SocketError::PassivePrepare {
                op: "set non-blocking mode",
                source,
            })?;
        pin_backlog(listener.as_raw_fd())?;

        info!(?path, "listening on unix domain socket");
        Ok(Self {
            inner: Some(ListenerInner::Unix(listener)),
            path: Some(path),
        })
    }

    /// Wait cooperatively for the next connection.
    ///
    /// Polls until a connection arrives or the predicate turns false, which
    /// surfaces as [`SocketError::UserStop`] so a server loop can unwind
    /// cleanly.
    pub fn accept<P: Fn() -> bool>(&self, keep_going: &P) -> Result<PointToPoint> {
        const OP: &str = "accept";

        let listener = self.inner.as_ref().ok_or(SocketError::PassivePrepare {
            op: OP,
            source: io::ErrorKind::NotConnected.into(),
        })?;

        loop {
            let accepted = match listener {
                ListenerInner::Tcp(listener) => listener
                    .accept()
                    .map(|(stream, _)| PointToPoint::from_tcp(stream)),
                #[cfg(unix)]
                ListenerInner::Unix(listener) => listener
                    .accept()
                    .map(|(stream, _)| PointToPoint::from_unix(stream)),
            };

            match accepted {
                Ok(wrapped) => {
                    let socket = wrapped.map_err(|source| SocketError::PassivePrepare {
                        op: "set non-blocking mode",
                        source,
                    })?;
                    debug!("accepted connection");
                    return Ok(socket);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(YIELD_INTERVAL);
                    if !keep_going() {
                        return Err(SocketError::UserStop);
                    }
                }
                Err(source) => return Err(SocketError::Transport { op: OP, source }),
            }
        }
    }

    /// The bound Unix-domain socket path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The locally bound address, if this is a TCP listener. Useful when
    /// binding port 0 and letting the OS pick.
    pub fn tcp_addr(&self) -> Option<std::net::SocketAddr> {
        match &self.inner {
            Some(ListenerInner::Tcp(listener)) => listener.local_addr().ok(),
            _ => None,
        }
    }

    /// Stop listening and release the socket (and its filesystem node for
    /// Unix-domain listeners). Safe to call more than once.
    pub fn close(&mut self) {
        if self.inner.take().is_none() {
            return;
        }
        if let Some(path) = &self.path {
            debug!(?path, "removing socket file");
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Drop for ServerSocket {
    fn drop(&mut self) {
        self.close();
    }
}

/// Re-issue `listen` on an already-listening socket to pin the backlog;
/// POSIX allows this to adjust the queue depth std chose.
#[cfg(unix)]
fn pin_backlog(fd: libc::c_int) -> Result<()> {
    // SAFETY: `fd` is an open, owned listening socket descriptor.
    let rc = unsafe { libc::listen(fd, LISTEN_BACKLOG) };
    if rc != 0 {
        return Err(SocketError::PassivePrepare {
            op: "listen",
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
