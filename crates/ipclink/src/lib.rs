//! Lightweight inter-process communication: framed messages and RPC.
//!
//! ipclink provides two composable layers over stream sockets:
//!
//! - [`message`] — a length-prefixed, tagged binary codec with typed
//!   streaming serialization ([`message::OutMessage`] /
//!   [`message::InMessage`]).
//! - [`rpc`] — numeric-id dispatch on top of it, with reverse callbacks over
//!   the same connection during a single outstanding call.
//!
//! Transports ([`socket`]) are TCP (IPv4) and Unix-domain stream sockets,
//! all non-blocking with cooperative, predicate-driven cancellation.
//!
//! # Crate Structure
//!
//! - [`message`] — re-export of `ipclink-message`
//! - [`socket`] — re-export of `ipclink-socket`
//! - [`rpc`] — re-export of `ipclink-rpc`

/// Re-export message codec types.
pub mod message {
    pub use ipclink_message::*;
}

/// Re-export socket types.
pub mod socket {
    pub use ipclink_socket::*;
}

/// Re-export RPC types.
pub mod rpc {
    pub use ipclink_rpc::*;
}
