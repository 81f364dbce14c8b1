//! Per-stream state machine (RFC 7540 Section 5.1).
//!
//! A [`Stream`] validates every frame it sends or receives against its
//! current state, reassembles fragmented header blocks, and runs its own
//! [`FlowController`] for outbound DATA. It never touches the transport:
//! frames that pass the state machine are collected in an outbound queue
//! ([`Stream::poll_send`]) and lifecycle notifications in an event queue
//! ([`Stream::poll_event`]). The owning connection drains both after each
//! operation.

use std::collections::VecDeque;
use std::time::Instant;

use bytes::{Bytes, BytesMut};

use crate::error::{ErrorCode, H2Error};
use crate::flow_control::FlowController;
use crate::frame::{
    ContinuationFrame, DataFrame, Frame, FrameType, HeadersFrame, PriorityFrame, PrioritySpec,
    PushPromiseFrame, RstStreamFrame, WindowUpdateFrame, FRAME_LEN_MAX,
};
use crate::hpack::{H2Header, HpackContext};

/// Stream states, ordered so that everything from `Open` on counts as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

/// Outcome of looking a frame up in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(StreamState),
    Stay,
    /// The local side tried to send a frame the state does not allow.
    ImplementationError,
    /// Connection error PROTOCOL_ERROR.
    ProtocolError,
    /// Stream error STREAM_CLOSED.
    StreamClosed,
}

/// The transition table.
///
/// `fully_closed` is set once a closed stream's grace period has run out;
/// only then do late frames count as STREAM_CLOSED errors.
pub fn next_state(
    state: StreamState,
    frame_type: FrameType,
    end_stream: bool,
    dir: Direction,
    fully_closed: bool,
) -> Transition {
    use Direction::{Receive, Send};
    use FrameType as F;
    use StreamState as S;
    use Transition::*;

    let rejected = match dir {
        Send => ImplementationError,
        Receive => ProtocolError,
    };

    match (state, dir) {
        (S::Idle, _) => match frame_type {
            F::Headers => To(S::Open),
            F::PushPromise if dir == Receive => To(S::ReservedRemote),
            _ => rejected,
        },

        (S::ReservedLocal, _) => match (frame_type, dir) {
            (F::Headers, Send) => To(S::HalfClosedRemote),
            (F::RstStream, _) => To(S::Closed),
            (F::Priority, Receive) => Stay,
            _ => rejected,
        },

        (S::ReservedRemote, _) => match (frame_type, dir) {
            (F::Headers, Receive) => To(S::HalfClosedLocal),
            (F::RstStream, _) => To(S::Closed),
            (F::Priority, Send) => Stay,
            _ => rejected,
        },

        (S::Open, _) => match frame_type {
            F::Data | F::Headers if end_stream => match dir {
                Send => To(S::HalfClosedLocal),
                Receive => To(S::HalfClosedRemote),
            },
            F::RstStream => To(S::Closed),
            _ => Stay,
        },

        (S::HalfClosedLocal, Send) => match frame_type {
            F::RstStream => To(S::Closed),
            F::Continuation | F::WindowUpdate | F::Priority => Stay,
            _ => ImplementationError,
        },
        (S::HalfClosedLocal, Receive) => match frame_type {
            F::Data | F::Headers if end_stream => To(S::Closed),
            F::RstStream => To(S::Closed),
            _ => Stay,
        },

        (S::HalfClosedRemote, Send) => match frame_type {
            F::Data | F::Headers if end_stream => To(S::Closed),
            F::RstStream => To(S::Closed),
            _ => Stay,
        },
        (S::HalfClosedRemote, Receive) => match frame_type {
            F::RstStream => To(S::Closed),
            F::WindowUpdate | F::Continuation | F::Priority => Stay,
            _ => StreamClosed,
        },

        (S::Closed, Send) => match frame_type {
            F::RstStream | F::Priority => Stay,
            _ => ImplementationError,
        },
        (S::Closed, Receive) => match frame_type {
            F::Priority | F::RstStream => Stay,
            _ if fully_closed => StreamClosed,
            _ => Stay,
        },
    }
}

/// Notifications a stream raises toward the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The stream reached `open` or beyond for the first time.
    Active,
    State(StreamState),
    Data(Bytes),
    Headers(Vec<H2Header>),
    PushPromise {
        promised_stream_id: u32,
        headers: Vec<H2Header>,
    },
    Priority(PrioritySpec),
    /// The peer reset the stream with CANCEL.
    Cancel,
    /// The peer finished sending.
    End,
    Error {
        code: ErrorCode,
        connection_error: bool,
    },
    Close {
        had_error: bool,
    },
}

/// Per-call options for outbound HEADERS, DATA and PUSH_PROMISE frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub end_stream: bool,
    pub padding: Option<u8>,
    /// HEADERS only.
    pub priority: Option<PrioritySpec>,
}

impl SendOptions {
    pub fn end_stream() -> Self {
        Self {
            end_stream: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BlockKind {
    Headers {
        end_stream: bool,
        priority: Option<PrioritySpec>,
    },
    PushPromise {
        promised_stream_id: u32,
    },
}

impl BlockKind {
    fn frame_type(&self) -> FrameType {
        match self {
            BlockKind::Headers { .. } => FrameType::Headers,
            BlockKind::PushPromise { .. } => FrameType::PushPromise,
        }
    }

    fn end_stream(&self) -> bool {
        matches!(self, BlockKind::Headers { end_stream: true, .. })
    }
}

/// A received header block waiting for its END_HEADERS frame.
#[derive(Debug)]
struct PendingBlock {
    kind: BlockKind,
    fragments: BytesMut,
}

#[derive(Debug)]
pub struct Stream {
    id: u32,
    state: StreamState,
    flow: FlowController,
    /// Set once the post-close grace period has elapsed.
    fully_closed: bool,
    grace_deadline: Option<Instant>,
    activated: bool,
    errored: bool,
    close_emitted: bool,
    /// END_STREAM has been queued locally, even if flow control still holds it.
    local_end_queued: bool,
    recv_block: Option<PendingBlock>,
    /// Outbound header block whose END_HEADERS frame has not been released yet.
    send_block: Option<BlockKind>,
    max_header_block_size: usize,
    outbound: VecDeque<Frame>,
    events: VecDeque<StreamEvent>,
}

impl Stream {
    /// A new stream; `promised` streams start in `reserved_local`.
    pub fn new(id: u32, initial_window_size: u32, promised: bool, max_header_block_size: usize) -> Self {
        let mut stream = Self {
            id,
            state: StreamState::Idle,
            flow: FlowController::new(initial_window_size),
            fully_closed: false,
            grace_deadline: None,
            activated: false,
            errored: false,
            close_emitted: false,
            local_end_queued: false,
            recv_block: None,
            send_block: None,
            max_header_block_size,
            outbound: VecDeque::new(),
            events: VecDeque::new(),
        };
        if promised {
            stream.set_state(StreamState::ReservedLocal);
        }
        stream
    }

    /// Placeholder for a stream that closed and was swept from the table.
    pub(crate) fn tombstone(id: u32, max_header_block_size: usize) -> Self {
        let mut stream = Self::new(id, 0, false, max_header_block_size);
        stream.state = StreamState::Closed;
        stream.fully_closed = true;
        stream.close_emitted = true;
        stream
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Closed and past its grace period.
    pub fn is_closed(&self) -> bool {
        self.fully_closed
    }

    /// True once the stream has counted toward the concurrency limit.
    pub fn is_active(&self) -> bool {
        self.activated
    }

    /// Send window of this stream.
    pub fn window(&self) -> i64 {
        self.flow.window()
    }

    /// True while a received header block is waiting for CONTINUATION frames.
    pub fn is_continuing(&self) -> bool {
        self.recv_block.is_some()
    }

    /// True while the peer may still send DATA.
    pub fn can_receive_data(&self) -> bool {
        matches!(self.state, StreamState::Open | StreamState::HalfClosedLocal)
    }

    pub fn poll_send(&mut self) -> Option<Frame> {
        self.outbound.pop_front()
    }

    pub fn poll_event(&mut self) -> Option<StreamEvent> {
        self.events.pop_front()
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    pub fn send_headers(
        &mut self,
        hpack: &mut HpackContext,
        headers: &[H2Header],
        opts: SendOptions,
    ) -> Result<(), H2Error> {
        self.send_headers_behind(hpack, headers, opts, false)
    }

    /// Like [`Stream::send_headers`]; `behind_data` tells the stream that
    /// the connection still holds DATA of this stream.
    ///
    /// A block that waits behind DATA is encoded without the dynamic table,
    /// since later blocks on other streams may overtake it.
    pub(crate) fn send_headers_behind(
        &mut self,
        hpack: &mut HpackContext,
        headers: &[H2Header],
        opts: SendOptions,
        behind_data: bool,
    ) -> Result<(), H2Error> {
        self.check_send(FrameType::Headers, opts.end_stream)?;
        if opts.end_stream {
            self.local_end_queued = true;
        }

        let block = if behind_data || self.flow.queued() > 0 {
            hpack.compress_unindexed(headers)
        } else {
            hpack.compress(headers)
        };
        let head = HeadersFrame {
            stream_id: self.id,
            header_block: Bytes::new(),
            end_stream: opts.end_stream,
            end_headers: true,
            priority: opts.priority,
            padding: opts.padding,
        };
        let overhead = head.length();
        for frame in split_header_block(self.id, block, overhead, |fragment, end_headers| {
            HeadersFrame {
                header_block: fragment,
                end_headers,
                ..head
            }
            .into()
        }) {
            self.queue_frame(frame);
        }
        Ok(())
    }

    /// Promise `promised_stream_id` on this (associated) stream.
    pub fn send_push_promise(
        &mut self,
        hpack: &mut HpackContext,
        promised_stream_id: u32,
        headers: &[H2Header],
        opts: SendOptions,
    ) -> Result<(), H2Error> {
        self.check_send(FrameType::PushPromise, false)?;

        let block = hpack.compress(headers);
        let head = PushPromiseFrame {
            stream_id: self.id,
            promised_stream_id,
            header_block: Bytes::new(),
            end_headers: true,
            padding: opts.padding,
        };
        let overhead = head.length();
        for frame in split_header_block(self.id, block, overhead, |fragment, end_headers| {
            PushPromiseFrame {
                header_block: fragment,
                end_headers,
                ..head
            }
            .into()
        }) {
            self.queue_frame(frame);
        }
        Ok(())
    }

    pub fn send_data(&mut self, data: impl Into<Bytes>, opts: SendOptions) -> Result<(), H2Error> {
        self.check_send(FrameType::Data, opts.end_stream)?;
        if opts.end_stream {
            self.local_end_queued = true;
        }
        self.queue_frame(
            DataFrame {
                stream_id: self.id,
                data: data.into(),
                end_stream: opts.end_stream,
                padding: opts.padding,
            }
            .into(),
        );
        Ok(())
    }

    pub fn send_priority(&mut self, priority: PrioritySpec) -> Result<(), H2Error> {
        self.check_send(FrameType::Priority, false)?;
        self.queue_frame(
            PriorityFrame {
                stream_id: self.id,
                priority,
            }
            .into(),
        );
        Ok(())
    }

    pub fn send_rst_stream(&mut self, code: ErrorCode) -> Result<(), H2Error> {
        self.check_send(FrameType::RstStream, false)?;
        self.queue_frame(
            RstStreamFrame {
                stream_id: self.id,
                error_code: code,
            }
            .into(),
        );
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), H2Error> {
        self.send_rst_stream(ErrorCode::CANCEL)
    }

    /// Give the peer `increment` more bytes of receive window on this stream.
    pub fn send_window_update(&mut self, increment: u32) -> Result<(), H2Error> {
        self.check_send(FrameType::WindowUpdate, false)?;
        self.queue_frame(
            WindowUpdateFrame {
                stream_id: self.id,
                increment,
            }
            .into(),
        );
        Ok(())
    }

    /// Dry run of a send against the state the stream will be in once
    /// everything already queued has gone out.
    fn check_send(&self, frame_type: FrameType, end_stream: bool) -> Result<(), H2Error> {
        if self.local_end_queued && matches!(frame_type, FrameType::Data | FrameType::Headers) {
            return Err(H2Error::implementation(format!(
                "{frame_type:?} on stream {} after END_STREAM",
                self.id
            )));
        }
        match next_state(self.state, frame_type, end_stream, Direction::Send, self.fully_closed) {
            Transition::To(_) | Transition::Stay => Ok(()),
            _ => Err(H2Error::implementation(format!(
                "cannot send {frame_type:?} on stream {} in state {:?}",
                self.id, self.state
            ))),
        }
    }

    fn queue_frame(&mut self, frame: Frame) {
        let mut released = Vec::new();
        self.flow.push(frame, &mut released);
        self.release(released);
    }

    /// Run frames leaving the flow controller through the state machine.
    fn release(&mut self, frames: Vec<Frame>) {
        for frame in frames {
            let step = match &frame {
                Frame::Headers(f) if !f.end_headers => {
                    self.send_block = Some(BlockKind::Headers {
                        end_stream: f.end_stream,
                        priority: f.priority,
                    });
                    None
                }
                Frame::PushPromise(f) if !f.end_headers => {
                    self.send_block = Some(BlockKind::PushPromise {
                        promised_stream_id: f.promised_stream_id,
                    });
                    None
                }
                Frame::Continuation(f) => match self.send_block {
                    Some(kind) if f.end_headers => {
                        self.send_block = None;
                        Some((kind.frame_type(), kind.end_stream()))
                    }
                    _ => None,
                },
                other => Some((other.frame_type(), other.is_end_stream())),
            };

            self.outbound.push_back(frame);
            if let Some((frame_type, end_stream)) = step {
                self.transition(frame_type, end_stream, Direction::Send);
            }
        }
    }

    // ------------------------------------------------------------------
    // Receiving
    // ------------------------------------------------------------------

    /// Handle a frame received for this stream.
    ///
    /// Stream errors are dealt with here (RST_STREAM plus an `Error` event);
    /// an `Err` is always a connection error.
    pub fn process(&mut self, frame: Frame, hpack: &mut HpackContext) -> Result<(), H2Error> {
        if self.recv_block.is_some() && !matches!(frame, Frame::Continuation(_)) {
            return Err(self.fail_connection(format!(
                "{:?} on stream {} while a header block is open",
                frame.frame_type(),
                self.id
            )));
        }

        match frame {
            Frame::Headers(f) => {
                let kind = BlockKind::Headers {
                    end_stream: f.end_stream,
                    priority: f.priority,
                };
                self.begin_block(kind, f.header_block, f.end_headers, hpack)
            }
            Frame::PushPromise(f) => {
                if self.state == StreamState::Idle {
                    return Err(self.fail_connection(format!(
                        "PUSH_PROMISE on idle stream {}",
                        self.id
                    )));
                }
                let kind = BlockKind::PushPromise {
                    promised_stream_id: f.promised_stream_id,
                };
                self.begin_block(kind, f.header_block, f.end_headers, hpack)
            }
            Frame::Continuation(f) => {
                let Some(mut block) = self.recv_block.take() else {
                    return Err(self.fail_connection(format!(
                        "CONTINUATION on stream {} without a header block",
                        self.id
                    )));
                };
                block.fragments.extend_from_slice(&f.header_block);
                self.check_block_size(block.fragments.len())?;
                if f.end_headers {
                    self.finish_block(block, hpack)
                } else {
                    self.recv_block = Some(block);
                    Ok(())
                }
            }
            Frame::Data(f) => {
                let deliver = self.state != StreamState::Closed;
                if !self.accept(FrameType::Data, f.end_stream)? {
                    return Ok(());
                }
                if deliver && !f.data.is_empty() {
                    self.events.push_back(StreamEvent::Data(f.data));
                }
                self.transition(FrameType::Data, f.end_stream, Direction::Receive);
                Ok(())
            }
            Frame::Priority(f) => {
                let deliver = self.state != StreamState::Closed;
                if !self.accept(FrameType::Priority, false)? {
                    return Ok(());
                }
                if deliver {
                    self.events.push_back(StreamEvent::Priority(f.priority));
                }
                self.transition(FrameType::Priority, false, Direction::Receive);
                Ok(())
            }
            Frame::RstStream(f) => {
                if self.state == StreamState::Closed {
                    log::debug!("stream {} ignoring RST_STREAM {} while closed", self.id, f.error_code);
                    return Ok(());
                }
                if !self.accept(FrameType::RstStream, false)? {
                    return Ok(());
                }
                match f.error_code {
                    ErrorCode::CANCEL => self.events.push_back(StreamEvent::Cancel),
                    ErrorCode::NO_ERROR => {}
                    code => {
                        log::warn!("stream {} reset by peer: {}", self.id, code);
                        self.errored = true;
                        self.events.push_back(StreamEvent::Error {
                            code,
                            connection_error: false,
                        });
                    }
                }
                self.transition(FrameType::RstStream, false, Direction::Receive);
                Ok(())
            }
            Frame::WindowUpdate(f) => {
                let closed = self.state == StreamState::Closed;
                if !self.accept(FrameType::WindowUpdate, false)? || closed {
                    return Ok(());
                }
                if f.increment == 0 {
                    self.stream_error(ErrorCode::PROTOCOL_ERROR);
                    return Ok(());
                }
                let mut released = Vec::new();
                if self.flow.increase_window_size(f.increment, &mut released).is_err() {
                    self.stream_error(ErrorCode::FLOW_CONTROL_ERROR);
                    return Ok(());
                }
                self.release(released);
                Ok(())
            }
            other => {
                log::debug!(
                    "stream {} ignoring connection-level {:?}",
                    self.id,
                    other.frame_type()
                );
                Ok(())
            }
        }
    }

    fn begin_block(
        &mut self,
        kind: BlockKind,
        fragment: Bytes,
        end_headers: bool,
        hpack: &mut HpackContext,
    ) -> Result<(), H2Error> {
        self.check_block_size(fragment.len())?;
        let block = PendingBlock {
            kind,
            fragments: BytesMut::from(&fragment[..]),
        };
        if end_headers {
            self.finish_block(block, hpack)
        } else {
            self.recv_block = Some(block);
            Ok(())
        }
    }

    fn check_block_size(&self, size: usize) -> Result<(), H2Error> {
        if size > self.max_header_block_size {
            return Err(H2Error::HeaderBlockTooLarge {
                size,
                max: self.max_header_block_size,
            });
        }
        Ok(())
    }

    /// Decompress a complete header block and apply its transition.
    ///
    /// The block is decompressed even when the stream rejects it, since the
    /// peer's compressor has already updated its dynamic table.
    fn finish_block(&mut self, block: PendingBlock, hpack: &mut HpackContext) -> Result<(), H2Error> {
        let headers = hpack.decompress(&block.fragments)?;
        let frame_type = block.kind.frame_type();
        let end_stream = block.kind.end_stream();

        let deliver = self.state != StreamState::Closed;
        if !self.accept(frame_type, end_stream)? {
            return Ok(());
        }
        if deliver {
            match block.kind {
                BlockKind::Headers { priority, .. } => {
                    if let Some(priority) = priority {
                        self.events.push_back(StreamEvent::Priority(priority));
                    }
                    self.events.push_back(StreamEvent::Headers(headers));
                }
                BlockKind::PushPromise { promised_stream_id } => {
                    self.events.push_back(StreamEvent::PushPromise {
                        promised_stream_id,
                        headers,
                    });
                }
            }
        }
        // PUSH_PROMISE moves the promised stream, not this one.
        if frame_type != FrameType::PushPromise {
            self.transition(frame_type, end_stream, Direction::Receive);
        }
        Ok(())
    }

    /// Check a received frame against the table. `Ok(false)` means the
    /// frame was answered with a stream error and must not be processed.
    fn accept(&mut self, frame_type: FrameType, end_stream: bool) -> Result<bool, H2Error> {
        match next_state(self.state, frame_type, end_stream, Direction::Receive, self.fully_closed) {
            Transition::To(_) | Transition::Stay => Ok(true),
            Transition::StreamClosed => {
                self.stream_error(ErrorCode::STREAM_CLOSED);
                Ok(false)
            }
            Transition::ProtocolError | Transition::ImplementationError => Err(self.fail_connection(
                format!("{frame_type:?} on stream {} in state {:?}", self.id, self.state),
            )),
        }
    }

    /// Apply a validated transition, following END_STREAM through a freshly
    /// opened stream.
    fn transition(&mut self, frame_type: FrameType, end_stream: bool, dir: Direction) {
        let previous = self.state;
        let next = match next_state(previous, frame_type, end_stream, dir, self.fully_closed) {
            Transition::To(next) => next,
            Transition::Stay => previous,
            other => {
                log::warn!(
                    "stream {} dropped {dir:?} {frame_type:?} in state {previous:?}: {other:?}",
                    self.id
                );
                return;
            }
        };

        // idle -> open and reserved -> half closed still owe the END_STREAM step.
        let owes_end_step =
            end_stream && previous < StreamState::Open && next != previous && next != StreamState::Closed;
        // End is reported ahead of the state change it causes, so Close stays last.
        let remote_end = end_stream && dir == Direction::Receive && previous != StreamState::Closed;

        if remote_end && !owes_end_step {
            self.events.push_back(StreamEvent::End);
        }
        if next != previous {
            self.set_state(next);
        }
        if previous < StreamState::Open && StreamState::Open <= next && !self.activated {
            self.activated = true;
            self.events.push_back(StreamEvent::Active);
        }
        if owes_end_step {
            if remote_end {
                self.events.push_back(StreamEvent::End);
            }
            self.transition_end_stream(frame_type, dir);
        }
    }

    fn transition_end_stream(&mut self, frame_type: FrameType, dir: Direction) {
        if let Transition::To(next) = next_state(self.state, frame_type, true, dir, self.fully_closed) {
            if next != self.state {
                self.set_state(next);
            }
        }
    }

    fn set_state(&mut self, state: StreamState) {
        log::debug!("stream {} state {:?} -> {:?}", self.id, self.state, state);
        self.state = state;
        self.events.push_back(StreamEvent::State(state));
        if state == StreamState::Closed {
            self.on_closed();
        }
    }

    fn on_closed(&mut self) {
        self.flow.clear();
        self.recv_block = None;
        self.send_block = None;
        if !self.close_emitted {
            self.close_emitted = true;
            self.events.push_back(StreamEvent::Close {
                had_error: self.errored,
            });
        }
    }

    /// Reset the stream with `code` and report it locally.
    fn stream_error(&mut self, code: ErrorCode) {
        log::warn!("stream {} error {}", self.id, code);
        self.outbound.push_back(
            RstStreamFrame {
                stream_id: self.id,
                error_code: code,
            }
            .into(),
        );
        self.errored = true;
        self.events.push_back(StreamEvent::Error {
            code,
            connection_error: false,
        });
        if self.state != StreamState::Closed {
            self.set_state(StreamState::Closed);
        }
    }

    /// Close the stream because the connection is about to fail.
    fn fail_connection(&mut self, reason: String) -> H2Error {
        self.errored = true;
        self.events.push_back(StreamEvent::Error {
            code: ErrorCode::PROTOCOL_ERROR,
            connection_error: true,
        });
        if self.state != StreamState::Closed {
            self.set_state(StreamState::Closed);
        }
        H2Error::protocol(reason)
    }

    // ------------------------------------------------------------------
    // Connection hooks
    // ------------------------------------------------------------------

    /// Peer-driven change of SETTINGS_INITIAL_WINDOW_SIZE.
    pub fn update_initial_window_size(&mut self, size: u32) -> Result<(), H2Error> {
        let mut released = Vec::new();
        self.flow
            .update_initial_window_size(size, &mut released)
            .map_err(|_| {
                H2Error::connection(
                    ErrorCode::FLOW_CONTROL_ERROR,
                    format!("stream {} window overflow", self.id),
                )
            })?;
        self.release(released);
        Ok(())
    }

    /// Move a freshly created promised stream into `reserved_remote`.
    pub(crate) fn reserve_remote(&mut self) {
        if self.state == StreamState::Idle {
            self.set_state(StreamState::ReservedRemote);
        }
    }

    /// Close a stream that would exceed the concurrency limit. Only
    /// peer-initiated streams need `send_rst`; a local one was never announced.
    pub(crate) fn refuse(&mut self, send_rst: bool) {
        log::debug!("stream {} refused", self.id);
        if send_rst {
            self.outbound.push_back(
                RstStreamFrame {
                    stream_id: self.id,
                    error_code: ErrorCode::REFUSED_STREAM,
                }
                .into(),
            );
        }
        self.errored = true;
        self.events.push_back(StreamEvent::Error {
            code: ErrorCode::REFUSED_STREAM,
            connection_error: false,
        });
        self.set_state(StreamState::Closed);
    }

    /// Connection teardown: close without sending anything.
    pub(crate) fn force_close(&mut self, had_error: bool) {
        self.errored |= had_error;
        self.outbound.clear();
        if self.state != StreamState::Closed {
            self.set_state(StreamState::Closed);
        }
        self.fully_closed = true;
        self.grace_deadline = None;
    }

    /// Start the grace period once the stream is closed.
    pub(crate) fn start_grace(&mut self, deadline: Instant) {
        if self.state == StreamState::Closed && !self.fully_closed && self.grace_deadline.is_none() {
            self.grace_deadline = Some(deadline);
        }
    }

    pub(crate) fn grace_deadline(&self) -> Option<Instant> {
        self.grace_deadline
    }

    /// Mark the stream fully closed if its grace period has run out.
    pub(crate) fn expire_grace(&mut self, now: Instant) -> bool {
        match self.grace_deadline {
            Some(deadline) if deadline <= now => {
                self.grace_deadline = None;
                self.fully_closed = true;
                log::debug!("stream {} fully closed", self.id);
                true
            }
            _ => false,
        }
    }
}

/// Split a header block into a head frame plus CONTINUATION frames.
///
/// `overhead` is the head frame's payload length without any header block
/// (padding, priority, promised id). Only the last frame carries END_HEADERS.
fn split_header_block(
    stream_id: u32,
    mut block: Bytes,
    overhead: usize,
    head: impl FnOnce(Bytes, bool) -> Frame,
) -> Vec<Frame> {
    let first = FRAME_LEN_MAX.saturating_sub(overhead).min(block.len());
    let fragment = block.split_to(first);
    let mut frames = vec![head(fragment, block.is_empty())];

    while !block.is_empty() {
        let fragment = block.split_to(FRAME_LEN_MAX.min(block.len()));
        frames.push(
            ContinuationFrame {
                stream_id,
                header_block: fragment,
                end_headers: block.is_empty(),
            }
            .into(),
        );
    }
    frames
}
