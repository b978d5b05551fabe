//! Scripted in-memory transport for tests and demos

use bytes::Bytes;
use std::collections::VecDeque;
use std::io;

use super::Transport;

/// An in-memory transport that plays the role of the device.
///
/// Incoming data is a queue of chunks handed out one per poll, which lets
/// tests exercise partial reads and the adaptive poll cadence. Reply rules
/// simulate a device reacting to what the engine sends: whenever a write
/// contains a rule's trigger text, the rule's chunks are appended to the
/// incoming queue.
///
/// # Examples
///
/// ```
/// use serialplay::transport::{MockTransport, Transport};
///
/// let mut t = MockTransport::new();
/// t.push_incoming("login: ");
/// t.reply_on("admin", "Password: ");
///
/// t.write(b"admin\n").unwrap();
/// assert_eq!(&t.poll_available().unwrap()[..], b"login: ");
/// assert_eq!(&t.poll_available().unwrap()[..], b"Password: ");
/// ```
#[derive(Default)]
pub struct MockTransport {
    incoming: VecDeque<Bytes>,
    replies: Vec<(String, Vec<Bytes>)>,
    writes: Vec<Vec<u8>>,
    closed: bool,
    fail_next_write: bool,
}

impl MockTransport {
    /// Create an empty mock with no scripted input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk of device output to be returned by a future poll.
    pub fn push_incoming(&mut self, chunk: impl Into<Bytes>) {
        self.incoming.push_back(chunk.into());
    }

    /// Add a reply rule: whenever a write contains `trigger`, queue `reply`
    /// as incoming data. Rules fire on every matching write.
    pub fn reply_on(&mut self, trigger: impl Into<String>, reply: impl Into<Bytes>) {
        self.replies.push((trigger.into(), vec![reply.into()]));
    }

    /// Like `reply_on`, but the reply arrives split into several chunks.
    pub fn reply_on_chunks(&mut self, trigger: impl Into<String>, chunks: Vec<Bytes>) {
        self.replies.push((trigger.into(), chunks));
    }

    /// Make the next write fail with a broken-pipe error.
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    /// All writes so far, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Everything written so far, concatenated and lossily decoded.
    pub fn written(&self) -> String {
        let all: Vec<u8> = self.writes.iter().flatten().copied().collect();
        String::from_utf8_lossy(&all).into_owned()
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"));
        }
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure"));
        }
        self.writes.push(data.to_vec());

        let written = String::from_utf8_lossy(data).into_owned();
        let mut queued = Vec::new();
        for (trigger, chunks) in &self.replies {
            if written.contains(trigger.as_str()) {
                queued.extend(chunks.iter().cloned());
            }
        }
        self.incoming.extend(queued);
        Ok(())
    }

    fn poll_available(&mut self) -> io::Result<Bytes> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"));
        }
        Ok(self.incoming.pop_front().unwrap_or_default())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
