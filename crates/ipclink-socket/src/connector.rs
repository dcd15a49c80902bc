use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, SocketError};
use crate::stream::PointToPoint;

/// Retry policy for establishing a connection.
///
/// The defaults match the classic behavior for racing a server that is still
/// coming up: ten attempts, one second apart, retrying only on refused /
/// would-block; anything else is terminal.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Maximum connection attempts before giving up.
    pub attempts: u32,
    /// Sleep between failed attempts.
    pub retry_delay: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Where to connect: an IPv4 TCP host/port or a Unix-domain socket path.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// TCP over IPv4. `host` may be a name (resolved, IPv4 only) or a
    /// literal address.
    Tcp { host: String, port: u16 },
    /// Unix-domain stream socket at a filesystem path.
    Unix(PathBuf),
}

impl Endpoint {
    /// Connect with the default retry policy.
    pub fn connect(&self) -> Result<PointToPoint> {
        self.connect_with_config(&ConnectConfig::default())
    }

    /// Connect with an explicit retry policy.
    pub fn connect_with_config(&self, config: &ConnectConfig) -> Result<PointToPoint> {
        match self {
            Endpoint::Tcp { host, port } => {
                let address = resolve_host(host)?;
                connect_tcp(address, *port, config)
            }
            Endpoint::Unix(path) => connect_unix(path, config),
        }
    }
}

/// Resolve a host name to its first IPv4 address.
pub fn resolve_host(host: &str) -> Result<Ipv4Addr> {
    let addrs = (host, 0u16)
        .to_socket_addrs()
        .map_err(|source| SocketError::Resolve {
            host: host.to_string(),
            source,
        })?;
    for addr in addrs {
        if let SocketAddr::V4(v4) = addr {
            return Ok(*v4.ip());
        }
    }
    Err(SocketError::BadHostname {
        host: host.to_string(),
    })
}

/// Connect to an IPv4 TCP endpoint and switch the stream to non-blocking
/// mode.
pub fn connect_tcp(address: Ipv4Addr, port: u16, config: &ConnectConfig) -> Result<PointToPoint> {
    let addr = SocketAddrV4::new(address, port);
    let stream = connect_with_retry(config, || TcpStream::connect(addr))?;
    debug!(%addr, "connected to tcp socket");
    PointToPoint::from_tcp(stream).map_err(|source| SocketError::ActivePrepare {
        op: "set non-blocking mode",
        source,
    })
}

/// Connect to a Unix-domain socket path and switch the stream to
/// non-blocking mode.
///
/// Fails fast (no retries) when nothing exists at the path.
#[cfg(unix)]
pub fn connect_unix(path: impl AsRef<Path>, config: &ConnectConfig) -> Result<PointToPoint> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SocketError::ActivePrepare {
            op: "connect",
            source: io::Error::new(ErrorKind::NotFound, "target does not exist"),
        });
    }

    let stream = connect_with_retry(config, || UnixStream::connect(path))?;
    debug!(?path, "connected to unix domain socket");
    PointToPoint::from_unix(stream).map_err(|source| SocketError::ActivePrepare {
        op: "set non-blocking mode",
        source,
    })
}

#[cfg(not(unix))]
pub fn connect_unix(path: impl AsRef<Path>, _config: &ConnectConfig) -> Result<PointToPoint> {
    let _ = path;
    Err(SocketError::ActivePrepare {
        op: "connect",
        source: io::Error::new(
            ErrorKind::Unsupported,
            "unix domain sockets are not available on this platform",
        ),
    })
}

fn connect_with_retry<S>(
    config: &ConnectConfig,
    mut attempt_connect: impl FnMut() -> io::Result<S>,
) -> Result<S> {
    let mut last_error: Option<io::Error> = None;
    for attempt in 1..=config.attempts.max(1) {
        match attempt_connect() {
            Ok(stream) => return Ok(stream),
            Err(err) if is_transient(&err) => {
                debug!(attempt, error = %err, "connect attempt failed, retrying");
                last_error = Some(err);
                thread::sleep(config.retry_delay);
            }
            Err(source) => return Err(SocketError::ActivePrepare {
                op: "connect",
                source,
            }),
        }
    }

    Err(SocketError::ActivePrepare {
        op: "connect",
        source: last_error.unwrap_or_else(|| ErrorKind::ConnectionRefused.into()),
    })
}

/// Transient connect failures worth retrying: refused and would-block
/// (`EAGAIN`). `EINPROGRESS` is a non-blocking-connect artifact — std's
/// blocking `connect` resolves it internally and can never return it — so
/// these two kinds are the full transient set reachable here.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::WouldBlock
    )
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn resolve_literal_ipv4() {
        assert_eq!(
            resolve_host("127.0.0.1").unwrap(),
            Ipv4Addr::new(127, 0, 0, 1)
        );
    }

    #[test]
    fn resolve_localhost() {
        let addr = resolve_host("localhost").unwrap();
        assert!(addr.is_loopback());
    }

    #[test]
    fn resolve_garbage_fails() {
        let err = resolve_host("definitely-not-a-host.invalid").unwrap_err();
        assert!(matches!(
            err,
            SocketError::Resolve { .. } | SocketError::BadHostname { .. }
        ));
    }

    #[test]
    fn missing_unix_path_fails_without_retrying() {
        let started = Instant::now();
        let err = connect_unix("/tmp/ipclink-definitely-missing.sock", &ConnectConfig::default())
            .unwrap_err();

        assert!(matches!(err, SocketError::ActivePrepare { .. }));
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "missing path must fail before the retry loop"
        );
    }

    #[test]
    fn refused_connect_retries_then_fails() {
        let dir = std::env::temp_dir().join(format!("ipclink-refused-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("dead.sock");

        // Bind and immediately drop: std leaves the socket file behind, so
        // connects reach a node nobody is listening on.
        drop(std::os::unix::net::UnixListener::bind(&sock_path).unwrap());
        assert!(sock_path.exists());

        let config = ConnectConfig {
            attempts: 3,
            retry_delay: Duration::from_millis(10),
        };
        let started = Instant::now();
        let err = connect_unix(&sock_path, &config).unwrap_err();

        assert!(matches!(err, SocketError::ActivePrepare { .. }));
        assert!(started.elapsed() >= Duration::from_millis(30));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn tcp_connect_to_dead_port_respects_attempt_limit() {
        // Port 1 on loopback is essentially never listening.
        let config = ConnectConfig {
            attempts: 1,
            retry_delay: Duration::from_millis(1),
        };
        let err = connect_tcp(Ipv4Addr::LOCALHOST, 1, &config).unwrap_err();
        assert!(matches!(err, SocketError::ActivePrepare { .. }));
    }
}
