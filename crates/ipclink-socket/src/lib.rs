//! Cooperative non-blocking stream sockets.
//!
//! Every socket in this crate runs in non-blocking mode; blocking semantics
//! are simulated by short sleeps between attempts. At each such yield point
//! the caller-supplied *keep-going predicate* is consulted — returning false
//! cancels the pending operation cleanly. The predicate is the only
//! cancellation mechanism: no worker threads, no signals, no timeouts.
//! A caller that wants a deadline encodes it in the predicate.
//!
//! Two transports are provided behind one connection type
//! ([`PointToPoint`]): TCP over IPv4 and Unix-domain stream sockets.

pub mod connector;
pub mod error;
pub mod listener;
pub mod stream;

pub use connector::{resolve_host, ConnectConfig, Endpoint};
pub use error::{Result, SocketError};
pub use listener::ServerSocket;
pub use stream::PointToPoint;

use std::time::Duration;

/// Sleep between attempts when an operation would block.
///
/// Bounds cancellation latency: a predicate flipping to false surfaces
/// within one interval.
pub(crate) const YIELD_INTERVAL: Duration = Duration::from_millis(50);
