use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::thread;

use ipclink_message::{InMessage, LengthField, OutMessage, LENGTH_SIZE, MAX_MESSAGE_SIZE};
use tracing::debug;

use crate::error::{Result, SocketError};
use crate::YIELD_INTERVAL;

/// A connected point-to-point stream carrying length-prefixed messages.
///
/// Owns exactly one duplex socket in non-blocking mode and moves exactly one
/// message at a time in each direction. All potentially blocking operations
/// take a keep-going predicate and return `Ok(false)` when it cancels them;
/// socket failures surface as [`SocketError::Transport`].
pub struct PointToPoint {
    inner: Option<StreamInner>,
}

enum StreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for StreamInner {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for StreamInner {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl PointToPoint {
    /// Wrap a TCP stream, switching it to non-blocking mode.
    pub(crate) fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            inner: Some(StreamInner::Tcp(stream)),
        })
    }

    /// Wrap a Unix-domain stream, switching it to non-blocking mode.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            inner: Some(StreamInner::Unix(stream)),
        })
    }

    /// Receive one complete message into `msg`.
    ///
    /// Reads the length header, validates the declared size against the codec
    /// limit, then reads the body. Returns `Ok(false)` (with `msg` reset) if
    /// the predicate cancelled before the message completed.
    pub fn read_message<P: Fn() -> bool>(
        &mut self,
        msg: &mut InMessage,
        keep_going: &P,
    ) -> Result<bool> {
        const OP: &str = "read message";

        let mut header = [0u8; LENGTH_SIZE];
        if !self.read_full(&mut header, keep_going, OP)? {
            msg.reset();
            return Ok(false);
        }

        let declared = LengthField::from_le_bytes(header) as usize;
        if declared > MAX_MESSAGE_SIZE {
            return Err(SocketError::OversizedMessage {
                declared,
                max: MAX_MESSAGE_SIZE,
            });
        }
        if declared < LENGTH_SIZE {
            return Err(SocketError::Transport {
                op: OP,
                source: io::Error::new(
                    ErrorKind::InvalidData,
                    format!("declared length {declared} is smaller than the header"),
                ),
            });
        }

        msg.reset();
        {
            let buf = msg.buffer_mut();
            buf.resize(declared, 0);
            buf[..LENGTH_SIZE].copy_from_slice(&header);
        }
        let complete = {
            let body = &mut msg.buffer_mut()[LENGTH_SIZE..];
            self.read_full(body, keep_going, OP)?
        };
        if !complete {
            msg.reset();
            return Ok(false);
        }

        msg.rewind();
        Ok(true)
    }

    /// Transmit one complete message.
    ///
    /// Returns `Ok(false)` if the predicate cancelled before the last byte
    /// went out; the connection should then be considered poisoned and
    /// closed.
    pub fn write_message<P: Fn() -> bool>(
        &mut self,
        msg: &OutMessage,
        keep_going: &P,
    ) -> Result<bool> {
        const OP: &str = "write message";

        let bytes = msg.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            match self.stream(OP)?.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(SocketError::Transport {
                        op: OP,
                        source: ErrorKind::WriteZero.into(),
                    })
                }
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(YIELD_INTERVAL);
                    if !keep_going() {
                        return Ok(false);
                    }
                }
                Err(err) => return Err(SocketError::Transport { op: OP, source: err }),
            }
        }

        loop {
            match self.stream(OP)?.flush() {
                Ok(()) => return Ok(true),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(YIELD_INTERVAL);
                    if !keep_going() {
                        return Ok(false);
                    }
                }
                Err(err) => return Err(SocketError::Transport { op: OP, source: err }),
            }
        }
    }

    /// Drain the socket until the peer closes it.
    ///
    /// Servers call this after their last reply so the client closes first
    /// and TIME_WAIT lands on the client side. Returns `Ok(false)` on
    /// cooperative cancellation.
    pub fn wait_for_shutdown<P: Fn() -> bool>(&mut self, keep_going: &P) -> Result<bool> {
        const OP: &str = "wait for shutdown";

        let mut sink = [0u8; 256];
        loop {
            match self.stream(OP)?.read(&mut sink) {
                Ok(0) => {
                    debug!("peer closed connection");
                    return Ok(true);
                }
                Ok(_) => {} // straggler bytes, discard
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(YIELD_INTERVAL);
                    if !keep_going() {
                        return Ok(false);
                    }
                }
                Err(err) if err.kind() == ErrorKind::ConnectionReset => return Ok(true),
                Err(err) => return Err(SocketError::Transport { op: OP, source: err }),
            }
        }
    }

    /// Close the connection. Safe to call more than once.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("closed connection");
        }
    }

    /// True once [`PointToPoint::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn read_full<P: Fn() -> bool>(
        &mut self,
        buf: &mut [u8],
        keep_going: &P,
        op: &'static str,
    ) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stream(op)?.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(SocketError::Transport {
                        op,
                        source: ErrorKind::UnexpectedEof.into(),
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(YIELD_INTERVAL);
                    if !keep_going() {
                        return Ok(false);
                    }
                }
                Err(err) => return Err(SocketError::Transport { op, source: err }),
            }
        }
        Ok(true)
    }

    fn stream(&mut self, op: &'static str) -> Result<&mut StreamInner> {
        self.inner.as_mut().ok_or(SocketError::Transport {
            op,
            source: ErrorKind::NotConnected.into(),
        })
    }
}

impl std::fmt::Debug for PointToPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transport = match &self.inner {
            Some(StreamInner::Tcp(_)) => "tcp",
            #[cfg(unix)]
            Some(StreamInner::Unix(_)) => "unix",
            None => "closed",
        };
        f.debug_struct("PointToPoint")
            .field("transport", &transport)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Write as _;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn pair() -> (PointToPoint, PointToPoint) {
        let (left, right) = UnixStream::pair().unwrap();
        (
            PointToPoint::from_unix(left).unwrap(),
            PointToPoint::from_unix(right).unwrap(),
        )
    }

    fn always() -> impl Fn() -> bool {
        || true
    }

    #[test]
    fn message_roundtrip_over_pair() {
        let (mut left, mut right) = pair();

        let mut out = OutMessage::new();
        out.append_str("ping").unwrap();
        out.append_u32(99).unwrap();
        assert!(left.write_message(&out, &always()).unwrap());

        let mut input = InMessage::new();
        assert!(right.read_message(&mut input, &always()).unwrap());
        assert_eq!(input.extract_str().unwrap(), "ping");
        assert_eq!(input.extract_u32().unwrap(), 99);
        assert!(input.is_empty());
    }

    #[test]
    fn several_messages_arrive_in_order() {
        let (mut left, mut right) = pair();

        for i in 0..5u32 {
            let mut out = OutMessage::new();
            out.append_u32(i).unwrap();
            assert!(left.write_message(&out, &always()).unwrap());
        }

        let mut input = InMessage::new();
        for i in 0..5u32 {
            assert!(right.read_message(&mut input, &always()).unwrap());
            assert_eq!(input.extract_u32().unwrap(), i);
        }
    }

    #[test]
    fn read_cancels_when_predicate_turns_false() {
        let (_left, mut right) = pair();

        let polls = AtomicUsize::new(0);
        let keep_going = || polls.fetch_add(1, Ordering::SeqCst) < 2;

        let mut input = InMessage::new();
        assert!(!right.read_message(&mut input, &keep_going).unwrap());
        assert!(input.is_empty());
    }

    #[test]
    fn read_cancels_mid_body_and_resets_message() {
        let (left, mut right) = pair();

        // Hand-feed a header that declares more than we send.
        let mut raw = match left.inner {
            Some(StreamInner::Unix(ref stream)) => stream.try_clone().unwrap(),
            _ => unreachable!(),
        };
        let declared = 32 as LengthField;
        raw.write_all(&declared.to_le_bytes()).unwrap();
        raw.write_all(&[1, 2, 3]).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let keep_going = move || !stop_flag.load(Ordering::SeqCst);
        stop.store(true, Ordering::SeqCst);

        let mut input = InMessage::new();
        assert!(!right.read_message(&mut input, &keep_going).unwrap());
        assert!(input.is_empty());
        assert_eq!(input.declared_len(), LENGTH_SIZE);
    }

    #[test]
    fn undersized_header_is_a_transport_error() {
        let (left, mut right) = pair();

        let mut raw = match left.inner {
            Some(StreamInner::Unix(ref stream)) => stream.try_clone().unwrap(),
            _ => unreachable!(),
        };
        raw.write_all(&(1 as LengthField).to_le_bytes()).unwrap();

        let mut input = InMessage::new();
        let err = right.read_message(&mut input, &always()).unwrap_err();
        assert!(matches!(err, SocketError::Transport { .. }));
    }

    #[test]
    fn peer_close_during_read_is_a_transport_error() {
        let (left, mut right) = pair();
        drop(left);

        let mut input = InMessage::new();
        let err = right.read_message(&mut input, &always()).unwrap_err();
        assert!(matches!(err, SocketError::Transport { .. }));
    }

    #[test]
    fn wait_for_shutdown_sees_peer_close() {
        let (mut left, mut right) = pair();

        let mut out = OutMessage::new();
        out.append_chr(b'x').unwrap();
        left.write_message(&out, &always()).unwrap();
        left.close();

        // Straggler bytes are discarded before EOF is reported.
        assert!(right.wait_for_shutdown(&always()).unwrap());
    }

    #[test]
    fn wait_for_shutdown_cancels() {
        let (_left, mut right) = pair();

        let polls = AtomicUsize::new(0);
        let keep_going = || polls.fetch_add(1, Ordering::SeqCst) < 2;
        assert!(!right.wait_for_shutdown(&keep_going).unwrap());
    }

    #[test]
    fn close_is_idempotent() {
        let (mut left, _right) = pair();
        assert!(!left.is_closed());

        left.close();
        left.close();
        assert!(left.is_closed());

        let mut input = InMessage::new();
        let err = left.read_message(&mut input, &always()).unwrap_err();
        assert!(matches!(err, SocketError::Transport { .. }));
    }
}
