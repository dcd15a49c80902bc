use std::marker::PhantomData;

use ipclink_message::{InMessage, OutMessage, WireValue};

use crate::error::Result;
use crate::DONE_TAG;

/// Lifts a typed callable into a wire-driven dispatch step.
///
/// `Args` is the argument list as a tuple (extracted from the incoming
/// message in declaration order), `R` the return type (`()` for void).
/// [`FunctionInvoker::invoke`] performs the full deserialize → call →
/// serialize sequence: it reads the arguments, runs the callable, resets the
/// out message and writes [`DONE_TAG`] followed by the return value.
///
/// The same step serves both sides of the protocol — a server answering a
/// top-level request and a client answering a reverse callback — because on
/// the wire every reply begins with the sentinel; that is what lets the
/// originator's receive loop tell replies from callback requests.
pub struct FunctionInvoker<Args, R> {
    _signature: PhantomData<fn(Args) -> R>,
}

impl<Args: WireValue, R: WireValue> FunctionInvoker<Args, R> {
    pub fn new() -> Self {
        Self {
            _signature: PhantomData,
        }
    }

    /// Extract `Args` from `input`, call `function`, and leave the reply
    /// (`DONE_TAG` + return value) in `output`, ready to transmit.
    pub fn invoke(
        &self,
        input: &mut InMessage,
        output: &mut OutMessage,
        function: impl FnOnce(Args) -> R,
    ) -> Result<()> {
        self.try_invoke(input, output, |args| Ok(function(args)))
    }

    /// Like [`FunctionInvoker::invoke`] for callables that can fail — e.g. a
    /// service that fetches its inputs through reverse callbacks on the
    /// connection it is serving. An error leaves `output` untouched; nothing
    /// is sent for a call that failed mid-flight.
    pub fn try_invoke(
        &self,
        input: &mut InMessage,
        output: &mut OutMessage,
        function: impl FnOnce(Args) -> Result<R>,
    ) -> Result<()> {
        let args = Args::extract(input)?;
        let result = function(args)?;

        output.clear();
        output.append_u32(DONE_TAG)?;
        result.append(output)?;
        Ok(())
    }
}

impl<Args: WireValue, R: WireValue> Default for FunctionInvoker<Args, R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use ipclink_message::{MessageError, RemotePtr};

    use super::*;
    use crate::error::RpcError;

    #[test]
    fn reply_carries_done_tag_then_result() {
        let mut request = OutMessage::new();
        request.append_i32(3).unwrap();
        request.append_i32(4).unwrap();

        let mut input = InMessage::from_bytes(request.as_bytes());
        let mut output = OutMessage::new();
        FunctionInvoker::<(i32, i32), i32>::new()
            .invoke(&mut input, &mut output, |(a, b)| a + b)
            .unwrap();

        let mut reply = InMessage::from_bytes(output.as_bytes());
        assert_eq!(reply.extract_u32().unwrap(), DONE_TAG);
        assert_eq!(reply.extract_i32().unwrap(), 7);
        assert!(reply.is_empty());
    }

    #[test]
    fn void_return_writes_done_tag_only() {
        let mut request = OutMessage::new();
        request.append_str("fire and forget").unwrap();

        let mut input = InMessage::from_bytes(request.as_bytes());
        let mut output = OutMessage::new();
        FunctionInvoker::<(String,), ()>::new()
            .invoke(&mut input, &mut output, |(_text,)| ())
            .unwrap();

        let mut reply = InMessage::from_bytes(output.as_bytes());
        assert_eq!(reply.extract_u32().unwrap(), DONE_TAG);
        assert!(reply.is_empty());
    }

    #[test]
    fn stale_output_is_discarded_before_the_reply() {
        let mut request = OutMessage::new();
        request.append_remote_ptr(RemotePtr::new(5)).unwrap();

        let mut input = InMessage::from_bytes(request.as_bytes());
        let mut output = OutMessage::new();
        output.append_str("leftover scratch").unwrap();

        FunctionInvoker::<(RemotePtr,), u64>::new()
            .invoke(&mut input, &mut output, |(handle,)| handle.raw() * 2)
            .unwrap();

        let mut reply = InMessage::from_bytes(output.as_bytes());
        assert_eq!(reply.extract_u32().unwrap(), DONE_TAG);
        assert_eq!(reply.extract_u64().unwrap(), 10);
        assert!(reply.is_empty());
    }

    #[test]
    fn missing_arguments_surface_as_codec_error() {
        let request = OutMessage::new();

        let mut input = InMessage::from_bytes(request.as_bytes());
        let mut output = OutMessage::new();
        let err = FunctionInvoker::<(i32, i32), i32>::new()
            .invoke(&mut input, &mut output, |(a, b)| a + b)
            .unwrap_err();

        assert!(matches!(
            err,
            RpcError::Message(MessageError::MessageTooShort { .. })
        ));
    }
}
