//! The per-connection NBD state machine: frames an arbitrarily chunked byte
//! stream into requests, dispatches them against a [`Device`], and
//! produces the ordered wire actions a transport should perform.

use bytes::{Bytes, BytesMut};

use crate::device::Device;
use crate::nbd::wire::{self, Command, Handle, RequestHeader};

/// A side effect the transport loop should perform, in order.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Write these bytes to the socket.
    Reply(Bytes),
    /// Close the connection; no further actions follow.
    Close,
}

#[derive(Debug)]
enum State {
    Ready,
    Writing {
        handle: Handle,
        offset: u64,
        remaining: u32,
    },
    /// A write failed mid-payload; the remaining declared payload bytes are
    /// consumed and discarded before the buffered error reply is sent. This
    /// preserves wire framing without requiring the connection to close.
    Discarding {
        handle: Handle,
        remaining: u32,
        error_code: u32,
    },
}

/// Owns one connection's unparsed-byte buffer and protocol state. The block
/// device is passed in per call rather than owned, since it is shared across
/// all connections on the same listener.
pub struct Connection {
    buffer: BytesMut,
    state: State,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            state: State::Ready,
        }
    }

    /// Feeds newly-received bytes into the state machine, returning the
    /// ordered actions a transport should take. If the returned actions end
    /// with [`Action::Close`], the connection must be closed immediately and
    /// no further `on_chunk` calls should be made.
    ///
    /// This folds the spec's "outer re-feed loop across dataReceived calls"
    /// into a single pass over the accumulated buffer: each iteration below
    /// consumes exactly what one `dataReceived` invocation would have
    /// consumed from whatever bytes are currently buffered, in the same
    /// order, so the observable wire behaviour is identical.
    pub fn on_chunk(&mut self, chunk: &[u8], dev: &dyn Device) -> Vec<Action> {
        self.buffer.extend_from_slice(chunk);
        let mut actions = Vec::new();

        loop {
            match &self.state {
                State::Ready => {
                    if self.buffer.len() < wire::REQUEST_HEADER_LEN {
                        break;
                    }
                    let header_bytes = self.buffer.split_to(wire::REQUEST_HEADER_LEN);
                    let header = match wire::parse_request(&header_bytes) {
                        Ok(h) => h,
                        Err(err) => {
                            tracing::info!(?err, "fatal protocol error, closing connection");
                            actions.push(Action::Close);
                            return actions;
                        }
                    };
                    tracing::debug!(
                        command = ?header.command,
                        offset = header.offset,
                        length = header.length,
                        "parsed request"
                    );
                    if self.dispatch_ready(header, dev, &mut actions) {
                        return actions;
                    }
                }
                State::Writing { .. } => {
                    if self.buffer.is_empty() {
                        break;
                    }
                    self.advance_writing(dev, &mut actions);
                }
                State::Discarding { .. } => {
                    if self.buffer.is_empty() {
                        break;
                    }
                    self.advance_discarding(&mut actions);
                }
            }
        }

        actions
    }

    /// Handles a freshly parsed header while in `Ready`. Returns `true` if
    /// the connection must close (a `DISCONNECT` was received).
    fn dispatch_ready(
        &mut self,
        header: RequestHeader,
        dev: &dyn Device,
        actions: &mut Vec<Action>,
    ) -> bool {
        match header.command {
            Command::Read => {
                actions.push(self.handle_read(header, dev));
                false
            }
            Command::Write => {
                self.state = State::Writing {
                    handle: header.handle,
                    offset: header.offset,
                    remaining: header.length,
                };
                false
            }
            Command::Disconnect => {
                actions.push(Action::Close);
                true
            }
        }
    }

    /// Pre-materialises the full read before emitting any bytes to the
    /// transport: an I/O error discovered after earlier segments have
    /// already been produced still yields a clean error reply with no
    /// payload, never a partially-written response.
    fn handle_read(&self, header: RequestHeader, dev: &dyn Device) -> Action {
        match dev.read(header.offset, header.length as u64) {
            Ok(segments) => {
                let mut body = Vec::with_capacity(header.length as usize);
                for segment in segments {
                    match segment {
                        Ok(bytes) => body.extend_from_slice(&bytes),
                        Err(err) => {
                            tracing::warn!(?err, "read failed mid-transfer");
                            // No payload is appended: the header for a
                            // failed read is the entire reply.
                            return Action::Reply(
                                wire::encode_reply_header(err.wire_code(), header.handle)
                                    .to_vec()
                                    .into(),
                            );
                        }
                    }
                }
                let mut reply = wire::encode_reply_header(0, header.handle).to_vec();
                reply.extend_from_slice(&body);
                Action::Reply(reply.into())
            }
            Err(err) => {
                tracing::warn!(?err, "read rejected before any I/O");
                Action::Reply(
                    wire::encode_reply_header(err.wire_code(), header.handle)
                        .to_vec()
                        .into(),
                )
            }
        }
    }

    fn advance_writing(&mut self, dev: &dyn Device, actions: &mut Vec<Action>) {
        let State::Writing {
            handle,
            offset,
            remaining,
        } = &mut self.state
        else {
            unreachable!()
        };

        let take = (*remaining as usize).min(self.buffer.len());
        let payload = self.buffer.split_to(take);

        match dev.write(*offset, &payload) {
            Ok(()) => {
                *offset += take as u64;
                *remaining -= take as u32;
                if *remaining == 0 {
                    actions.push(Action::Reply(
                        wire::encode_reply_header(0, *handle).to_vec().into(),
                    ));
                    self.state = State::Ready;
                }
            }
            Err(err) => {
                tracing::warn!(?err, "write failed mid-payload");
                let new_remaining = *remaining - take as u32;
                let error_code = err.wire_code();
                let handle = *handle;
                if new_remaining == 0 {
                    actions.push(Action::Reply(
                        wire::encode_reply_header(error_code, handle).to_vec().into(),
                    ));
                    self.state = State::Ready;
                } else {
                    self.state = State::Discarding {
                        handle,
                        remaining: new_remaining,
                        error_code,
                    };
                }
            }
        }
    }

    fn advance_discarding(&mut self, actions: &mut Vec<Action>) {
        let State::Discarding {
            handle,
            remaining,
            error_code,
        } = &mut self.state
        else {
            unreachable!()
        };

        let take = (*remaining as usize).min(self.buffer.len());
        let _ = self.buffer.split_to(take);
        *remaining -= take as u32;

        if *remaining == 0 {
            actions.push(Action::Reply(
                wire::encode_reply_header(*error_code, *handle).to_vec().into(),
            ));
            self.state = State::Ready;
        }
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}
