//! Function and callback identifiers of the demo arithmetic service.
//!
//! Server functions and client callbacks share one id space per direction;
//! only [`ipclink_rpc::DONE_TAG`] is reserved.

/// Server: `add(a, b) -> a + b`.
pub const ADD: u32 = 1;

/// Server: `add_with_callbacks(token)` — fetches both addends back from the
/// client via [`ARG1`]/[`ARG2`], then adds them.
pub const ADD_WITH_CALLBACKS: u32 = 2;

/// Client callback: first addend behind the token.
pub const ARG1: u32 = 100;

/// Client callback: second addend behind the token.
pub const ARG2: u32 = 101;

/// Human-readable name for log lines.
pub fn name(id: u32) -> &'static str {
    match id {
        ADD => "add",
        ADD_WITH_CALLBACKS => "add_with_callbacks",
        ARG1 => "arg1",
        ARG2 => "arg2",
        ipclink_rpc::DONE_TAG => "done",
        _ => "unknown",
    }
}
