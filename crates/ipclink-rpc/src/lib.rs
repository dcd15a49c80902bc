//! Function-id RPC over ipclink messages.
//!
//! A remote call is one message whose first field is a `u32` function id,
//! followed by the serialized arguments. Every reply starts with the
//! reserved [`DONE_TAG`] sentinel; a message whose first `u32` is anything
//! else is a *callback request* flowing in the opposite direction. That
//! in-band tagging lets a single outstanding call carry any number of
//! reverse callbacks over the same connection before its final result:
//!
//! ```text
//! client                                server
//!   │ ── [id, args…] ──────────────────▶ │
//!   │ ◀────────────── [cb_id, args…] ── │   (zero or more)
//!   │ ── [DONE_TAG, cb_result] ────────▶ │
//!   │ ◀──────────── [DONE_TAG, result] ─ │
//! ```
//!
//! Exactly one call is outstanding per connection at a time; parallelism is
//! per-connection.

pub mod caller;
pub mod error;
pub mod invoker;
pub mod server;

pub use caller::{call_by_channel, call_by_link, no_callbacks, CallbackDispatcher};
pub use error::{Result, RpcError};
pub use invoker::FunctionInvoker;
pub use server::{Dispatcher, RpcServer};

/// Reserved function id marking a reply message.
///
/// A reply whose first `u32` equals this constant terminates the receive
/// loop of the side that originated the call (or the callback). User
/// function ids must never collide with it.
pub const DONE_TAG: u32 = 0xFFFF_FFFF;
