//! HTTP/2 connection: stream multiplexing, SETTINGS negotiation and
//! connection-level error handling.
//!
//! The connection is sans-I/O. Bytes read from the transport go into
//! [`Connection::recv`], bytes to write come out of
//! [`Connection::take_pending_send`], and everything the application needs
//! to react to is queued as a [`ConnectionEvent`]. Time only moves when the
//! caller passes an [`Instant`] in; [`Connection::poll_timeout`] reports
//! the next deadline that needs a [`Connection::handle_timeout`] call.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{ErrorCode, H2Error};
use crate::flow_control::FlowController;
use crate::frame::{
    Frame, FrameType, GoAwayFrame, PingFrame, PrioritySpec, SettingsFrame, WindowUpdateFrame,
};
use crate::h2_codec::{H2Codec, Serializer, CONNECTION_PREFACE};
use crate::hpack::{H2Header, HpackContext, DEFAULT_HEADER_TABLE_SIZE};
use crate::settings::{Settings, DEFAULT_INITIAL_WINDOW_SIZE};
use crate::stream::{SendOptions, Stream, StreamEvent, StreamState};

/// Stream ids are 31 bits on the wire.
const MAX_STREAM_ID: u32 = 0x7fff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Notifications raised by a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection is ready: preface exchanged, initial SETTINGS sent.
    Connect,
    /// A stream was created, locally or by the peer.
    Stream(u32),
    /// A stream-level frame was routed and processed.
    Frame { stream_id: u32, frame_type: FrameType },
    /// A PING we sent was acknowledged.
    Ping([u8; 8]),
    Error(H2Error),
    Close { had_error: bool },
    /// The transport reported an idle timeout.
    Timeout,
    StreamEvent { stream_id: u32, event: StreamEvent },
}

#[derive(Debug)]
pub struct Connection {
    role: Role,
    config: Config,
    codec: H2Codec,
    serializer: Serializer,
    /// Connection-level send window.
    flow: FlowController,
    streams: HashMap<u32, Stream>,
    next_stream_id: u32,
    /// Highest peer-initiated stream id seen so far.
    max_remote_stream_id: u32,
    /// Highest stream id of any frame routed, reported in GOAWAY.
    last_stream_id: u32,
    /// Settings to announce once the connection starts.
    initial_settings: Settings,
    /// Our parameters, as acknowledged by the peer.
    local_settings: Settings,
    remote_settings: Settings,
    /// Sent SETTINGS frames awaiting ACK, oldest first, with their deadlines.
    pending_settings: VecDeque<(SettingsFrame, Instant)>,
    compressor: HpackContext,
    decompressor: HpackContext,
    local_streams: usize,
    remote_streams: usize,
    /// Stream whose header block is still open.
    continuation_stream: Option<u32>,
    events: VecDeque<ConnectionEvent>,
    now: Instant,
    connected: bool,
    closed: bool,
}

impl Connection {
    /// Client side: the preface and initial SETTINGS are queued right away.
    pub fn client(config: Config, settings: Settings, now: Instant) -> Self {
        let mut conn = Self::new(Role::Client, config, settings, now);
        conn.serializer.write_raw(CONNECTION_PREFACE);
        conn.start();
        conn
    }

    /// Server side: nothing is sent until the client preface arrives.
    pub fn server(config: Config, settings: Settings, now: Instant) -> Self {
        Self::new(Role::Server, config, settings, now)
    }

    fn new(role: Role, config: Config, settings: Settings, now: Instant) -> Self {
        let (codec, next_stream_id) = match role {
            Role::Client => (H2Codec::client(), 1),
            Role::Server => (H2Codec::server(), 2),
        };
        Self {
            role,
            compressor: HpackContext::with_options(config.huffman, DEFAULT_HEADER_TABLE_SIZE),
            decompressor: HpackContext::with_options(config.huffman, DEFAULT_HEADER_TABLE_SIZE),
            config,
            codec,
            serializer: Serializer::new(),
            flow: FlowController::new(DEFAULT_INITIAL_WINDOW_SIZE),
            streams: HashMap::new(),
            next_stream_id,
            max_remote_stream_id: 0,
            last_stream_id: 0,
            initial_settings: settings,
            local_settings: Settings::default(),
            remote_settings: Settings::default(),
            pending_settings: VecDeque::new(),
            local_streams: 0,
            remote_streams: 0,
            continuation_stream: None,
            events: VecDeque::new(),
            now,
            connected: false,
            closed: false,
        }
    }

    fn start(&mut self) {
        let frame = self.initial_settings.diff(&Settings::default());
        self.send_settings(frame);
        self.connected = true;
        self.events.push_back(ConnectionEvent::Connect);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn local_settings(&self) -> &Settings {
        &self.local_settings
    }

    pub fn remote_settings(&self) -> &Settings {
        &self.remote_settings
    }

    pub fn stream(&self, stream_id: u32) -> Option<&Stream> {
        self.streams.get(&stream_id)
    }

    /// Streams currently held in the table, tombstones included.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Active streams as (locally initiated, peer initiated).
    pub fn active_streams(&self) -> (usize, usize) {
        (self.local_streams, self.remote_streams)
    }

    pub fn last_stream_id(&self) -> u32 {
        self.last_stream_id
    }

    /// Connection-level send window.
    pub fn window(&self) -> i64 {
        self.flow.window()
    }

    /// Number of SETTINGS frames still waiting for an ACK.
    pub fn pending_settings(&self) -> usize {
        self.pending_settings.len()
    }

    fn is_local_id(&self, stream_id: u32) -> bool {
        match self.role {
            Role::Client => stream_id % 2 == 1,
            Role::Server => stream_id % 2 == 0,
        }
    }

    // ------------------------------------------------------------------
    // Transport side
    // ------------------------------------------------------------------

    /// Feed bytes read from the transport.
    ///
    /// Frames are processed in arrival order. The first connection error
    /// sends GOAWAY, closes the connection and is returned.
    pub fn recv(&mut self, data: &[u8], now: Instant) -> Result<(), H2Error> {
        self.now = now;
        if self.closed {
            return Ok(());
        }
        self.codec.extend(data);

        while !self.closed {
            let had_preface = self.codec.preface_received();
            let next = self.codec.next_frame();
            if !had_preface && self.codec.preface_received() {
                self.start();
            }

            let result = match next {
                Ok(Some(frame)) => self.process_frame(frame),
                Ok(None) => break,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                self.fatal(err.clone());
                return Err(err);
            }
        }
        Ok(())
    }

    /// Serialized bytes ready for the transport.
    pub fn take_pending_send(&mut self) -> Bytes {
        self.serializer.take()
    }

    pub fn has_pending_send(&self) -> bool {
        self.serializer.has_pending()
    }

    pub fn poll_event(&mut self) -> Option<ConnectionEvent> {
        self.events.pop_front()
    }

    /// The transport closed underneath us.
    pub fn transport_closed(&mut self, had_error: bool) {
        self.close(had_error);
    }

    /// The transport failed. Reported but not retried; the transport's own
    /// close follows.
    pub fn transport_error(&mut self, reason: impl Into<String>) {
        if !self.closed {
            self.events
                .push_back(ConnectionEvent::Error(H2Error::Transport(reason.into())));
        }
    }

    pub fn transport_timeout(&mut self) {
        self.events.push_back(ConnectionEvent::Timeout);
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Earliest deadline that needs [`Connection::handle_timeout`].
    pub fn poll_timeout(&self) -> Option<Instant> {
        if self.closed {
            return None;
        }
        let settings = self.pending_settings.iter().map(|(_, deadline)| *deadline);
        let grace = self.streams.values().filter_map(Stream::grace_deadline);
        settings.chain(grace).min()
    }

    pub fn handle_timeout(&mut self, now: Instant) {
        self.now = now;
        if self.closed {
            return;
        }

        if self.pending_settings.iter().any(|(_, deadline)| *deadline <= now) {
            self.fatal(H2Error::connection(
                ErrorCode::SETTINGS_TIMEOUT,
                "SETTINGS not acknowledged in time",
            ));
            return;
        }

        for stream in self.streams.values_mut() {
            stream.expire_grace(now);
        }
        self.sweep();
    }

    /// Drop fully closed streams once the table has grown past the threshold.
    fn sweep(&mut self) {
        if self.streams.len() <= self.config.stream_cleanup_threshold {
            return;
        }
        let before = self.streams.len();
        self.streams.retain(|_, stream| !stream.is_closed());
        log::debug!("swept {} closed streams", before - self.streams.len());
    }

    // ------------------------------------------------------------------
    // Inbound frames
    // ------------------------------------------------------------------

    fn process_frame(&mut self, frame: Frame) -> Result<(), H2Error> {
        let stream_id = frame.stream_id();
        let frame_type = frame.frame_type();

        if let Some(open) = self.continuation_stream {
            if frame_type != FrameType::Continuation || stream_id != open {
                return Err(H2Error::protocol(format!(
                    "{frame_type:?} on stream {stream_id} while stream {open} awaits CONTINUATION"
                )));
            }
        }

        if stream_id == 0 {
            if frame_type.is_stream_scoped() {
                return Err(H2Error::protocol(format!("{frame_type:?} on stream 0")));
            }
            return self.process_connection_frame(frame);
        }

        if !self.streams.contains_key(&stream_id) {
            self.open_remote(stream_id)?;
        }
        if let Frame::PushPromise(promise) = &frame {
            self.accept_promise(promise.promised_stream_id)?;
        }

        let received = match &frame {
            Frame::Data(data) => data.length() as u32,
            _ => 0,
        };
        let is_reset = frame_type == FrameType::RstStream;
        let opens_block = match &frame {
            Frame::Headers(f) => !f.end_headers,
            Frame::PushPromise(f) => !f.end_headers,
            Frame::Continuation(f) => !f.end_headers,
            _ => false,
        };

        let Some(stream) = self.streams.get_mut(&stream_id) else {
            return Err(H2Error::UnknownStream(stream_id));
        };
        let result = stream.process(frame, &mut self.decompressor);
        self.continuation_stream = (opens_block && stream.is_continuing()).then_some(stream_id);

        if received > 0 && self.config.auto_window_update {
            if stream.can_receive_data() && result.is_ok() {
                if let Err(err) = stream.send_window_update(received) {
                    log::debug!("no window update for stream {stream_id}: {err}");
                }
            }
            self.send_frame(
                WindowUpdateFrame {
                    stream_id: 0,
                    increment: received,
                }
                .into(),
            );
        }

        if is_reset {
            self.flow.discard_stream(stream_id);
        }
        self.drain_stream(stream_id);
        // A fully closed stream is rebuilt from the id bookkeeping when needed.
        if self
            .streams
            .get(&stream_id)
            .is_some_and(|stream| stream.is_closed() && !stream.is_continuing())
        {
            self.streams.remove(&stream_id);
        }
        result?;
        self.last_stream_id = self.last_stream_id.max(stream_id);

        self.events.push_back(ConnectionEvent::Frame {
            stream_id,
            frame_type,
        });
        Ok(())
    }

    /// Materialize the stream for a frame carrying an unknown id.
    fn open_remote(&mut self, stream_id: u32) -> Result<(), H2Error> {
        let known = if self.is_local_id(stream_id) {
            stream_id < self.next_stream_id
        } else {
            stream_id <= self.max_remote_stream_id
        };

        if known {
            log::debug!("frame for closed stream {stream_id}");
            self.streams
                .insert(stream_id, Stream::tombstone(stream_id, self.config.max_header_block_size));
            return Ok(());
        }
        if self.is_local_id(stream_id) {
            return Err(H2Error::protocol(format!(
                "frame on stream {stream_id}, which was never opened"
            )));
        }
        if self.role == Role::Client {
            return Err(H2Error::protocol(format!(
                "server opened stream {stream_id} without a PUSH_PROMISE"
            )));
        }

        self.max_remote_stream_id = stream_id;
        let mut stream = Stream::new(
            stream_id,
            self.remote_settings.initial_window_size,
            false,
            self.config.max_header_block_size,
        );
        if self.remote_streams >= self.local_settings.max_concurrent_streams as usize {
            log::warn!(
                "refusing stream {stream_id}: {} active, limit {}",
                self.remote_streams,
                self.local_settings.max_concurrent_streams
            );
            stream.refuse(true);
        }
        self.insert_stream(stream);
        Ok(())
    }

    fn accept_promise(&mut self, promised_stream_id: u32) -> Result<(), H2Error> {
        if self.role == Role::Server || !self.local_settings.enable_push {
            return Err(H2Error::protocol("PUSH_PROMISE received while push is disabled"));
        }
        if self.is_local_id(promised_stream_id) || promised_stream_id <= self.max_remote_stream_id {
            return Err(H2Error::protocol(format!(
                "invalid promised stream id {promised_stream_id}"
            )));
        }

        self.max_remote_stream_id = promised_stream_id;
        let mut stream = Stream::new(
            promised_stream_id,
            self.remote_settings.initial_window_size,
            false,
            self.config.max_header_block_size,
        );
        stream.reserve_remote();
        self.insert_stream(stream);
        Ok(())
    }

    fn process_connection_frame(&mut self, frame: Frame) -> Result<(), H2Error> {
        match frame {
            Frame::Settings(settings) if settings.ack => {
                let Some((sent, _)) = self.pending_settings.pop_front() else {
                    log::debug!("ignoring unsolicited SETTINGS ACK");
                    return Ok(());
                };
                log::debug!("local settings acknowledged: {:?}", sent.changed());
                self.local_settings.apply(&sent);
                if let Some(size) = sent.header_table_size {
                    self.decompressor.set_size_limit(size as usize);
                }
                if let Some(size) = sent.max_frame_size {
                    self.codec.set_max_frame_size(size as usize);
                }
            }
            Frame::Settings(settings) => {
                log::debug!("remote settings: {:?}", settings.changed());
                self.send_frame(SettingsFrame::ack().into());
                self.remote_settings.apply(&settings);
                if let Some(size) = settings.header_table_size {
                    self.compressor.set_header_table_size(size as usize);
                }
                if let Some(size) = settings.initial_window_size {
                    let mut ids: Vec<u32> = self.streams.keys().copied().collect();
                    ids.sort_unstable();
                    for id in ids {
                        if let Some(stream) = self.streams.get_mut(&id) {
                            stream.update_initial_window_size(size)?;
                        }
                        self.drain_stream(id);
                    }
                }
            }
            Frame::Ping(ping) if ping.ack => {
                self.events.push_back(ConnectionEvent::Ping(ping.data));
            }
            Frame::Ping(ping) => {
                self.send_frame(
                    PingFrame {
                        ack: true,
                        data: ping.data,
                    }
                    .into(),
                );
            }
            Frame::GoAway(goaway) => {
                if goaway.error_code == ErrorCode::NO_ERROR {
                    log::debug!("peer sent GOAWAY (last stream {})", goaway.last_stream_id);
                    self.close(false);
                } else {
                    log::warn!(
                        "peer sent GOAWAY {} (last stream {})",
                        goaway.error_code,
                        goaway.last_stream_id
                    );
                    self.events.push_back(ConnectionEvent::Error(H2Error::connection(
                        goaway.error_code,
                        String::from_utf8_lossy(&goaway.debug_data).into_owned(),
                    )));
                    self.close(true);
                }
            }
            Frame::WindowUpdate(update) => {
                if update.increment == 0 {
                    return Err(H2Error::protocol("connection WINDOW_UPDATE of 0"));
                }
                self.flow
                    .increase_window_size(update.increment, &mut self.serializer)
                    .map_err(|err| H2Error::connection(ErrorCode::FLOW_CONTROL_ERROR, err.to_string()))?;
            }
            other => {
                log::debug!("ignoring {:?} on stream 0", other.frame_type());
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stream plumbing
    // ------------------------------------------------------------------

    fn insert_stream(&mut self, stream: Stream) {
        let stream_id = stream.id();
        self.streams.insert(stream_id, stream);
        self.events.push_back(ConnectionEvent::Stream(stream_id));
        self.drain_stream(stream_id);
        self.sweep();
    }

    /// Move a stream's outbound frames into the connection flow controller
    /// and its events into the connection queue.
    fn drain_stream(&mut self, stream_id: u32) {
        let local = self.is_local_id(stream_id);
        let grace = self.now + self.config.stream_close_grace;
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            return;
        };

        while let Some(frame) = stream.poll_send() {
            if frame.frame_type() == FrameType::RstStream {
                self.flow.discard_stream(stream_id);
            }
            self.flow.push(frame, &mut self.serializer);
        }

        while let Some(event) = stream.poll_event() {
            let counter = if local {
                &mut self.local_streams
            } else {
                &mut self.remote_streams
            };
            match &event {
                StreamEvent::Active => *counter += 1,
                StreamEvent::Close { .. } if stream.is_active() => {
                    *counter = counter.saturating_sub(1)
                }
                StreamEvent::Error { code, .. } => {
                    log::warn!("stream {stream_id} error {code}");
                }
                _ => {}
            }
            self.events.push_back(ConnectionEvent::StreamEvent { stream_id, event });
        }

        if stream.state() == StreamState::Closed {
            stream.start_grace(grace);
        }
    }

    fn with_stream<F>(&mut self, stream_id: u32, op: F) -> Result<(), H2Error>
    where
        F: FnOnce(&mut Stream, &mut HpackContext) -> Result<(), H2Error>,
    {
        if self.closed {
            return Ok(());
        }
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(H2Error::UnknownStream(stream_id))?;
        let result = op(stream, &mut self.compressor);
        self.drain_stream(stream_id);
        result
    }

    fn send_frame(&mut self, frame: Frame) {
        self.flow.push(frame, &mut self.serializer);
    }

    // ------------------------------------------------------------------
    // Application side
    // ------------------------------------------------------------------

    /// Create a stream, allocating the next local id when `stream_id` is
    /// `None`. Returns `None` if push is disabled by the peer (for promised
    /// streams), if the id space is exhausted, or if the id is taken, which
    /// is fatal.
    pub fn create_stream(&mut self, stream_id: Option<u32>, promised: bool) -> Option<u32> {
        if self.closed {
            return None;
        }
        if promised && !self.remote_settings.enable_push {
            return None;
        }

        let stream_id = match stream_id {
            Some(id) => id,
            None => self.next_stream_id,
        };
        if stream_id == 0 || stream_id > MAX_STREAM_ID {
            log::warn!("stream id {stream_id} is outside the usable range");
            return None;
        }
        if self.streams.contains_key(&stream_id) {
            self.fatal(H2Error::protocol(format!("stream {stream_id} already exists")));
            return None;
        }
        let local = self.is_local_id(stream_id);
        if local && stream_id >= self.next_stream_id {
            self.next_stream_id = stream_id.checked_add(2)?;
        }

        let mut stream = Stream::new(
            stream_id,
            self.remote_settings.initial_window_size,
            promised,
            self.config.max_header_block_size,
        );
        if local && self.local_streams >= self.remote_settings.max_concurrent_streams as usize {
            log::warn!(
                "stream {stream_id} exceeds the peer's limit of {} concurrent streams",
                self.remote_settings.max_concurrent_streams
            );
            stream.refuse(false);
        }
        self.insert_stream(stream);
        Some(stream_id)
    }

    pub fn send_headers(
        &mut self,
        stream_id: u32,
        headers: &[H2Header],
        opts: SendOptions,
    ) -> Result<(), H2Error> {
        let behind_data = self.flow.has_queued(stream_id);
        self.with_stream(stream_id, |stream, hpack| {
            stream.send_headers_behind(hpack, headers, opts, behind_data)
        })
    }

    pub fn send_data(
        &mut self,
        stream_id: u32,
        data: impl Into<Bytes>,
        opts: SendOptions,
    ) -> Result<(), H2Error> {
        let data = data.into();
        self.with_stream(stream_id, |stream, _| stream.send_data(data, opts))
    }

    pub fn send_priority(&mut self, stream_id: u32, priority: PrioritySpec) -> Result<(), H2Error> {
        self.with_stream(stream_id, |stream, _| stream.send_priority(priority))
    }

    pub fn send_rst_stream(&mut self, stream_id: u32, code: ErrorCode) -> Result<(), H2Error> {
        self.with_stream(stream_id, |stream, _| stream.send_rst_stream(code))
    }

    pub fn cancel(&mut self, stream_id: u32) -> Result<(), H2Error> {
        self.with_stream(stream_id, |stream, _| stream.cancel())
    }

    /// Grant receive window; stream id 0 targets the connection window.
    pub fn send_window_update(&mut self, stream_id: u32, increment: u32) -> Result<(), H2Error> {
        if stream_id == 0 {
            if !self.closed {
                self.send_frame(
                    WindowUpdateFrame {
                        stream_id: 0,
                        increment,
                    }
                    .into(),
                );
            }
            return Ok(());
        }
        self.with_stream(stream_id, |stream, _| stream.send_window_update(increment))
    }

    /// Promise a pushed response on `stream_id`; returns the promised id.
    pub fn push_promise(
        &mut self,
        stream_id: u32,
        headers: &[H2Header],
        opts: SendOptions,
    ) -> Result<u32, H2Error> {
        if self.role != Role::Server {
            return Err(H2Error::implementation("only servers can push"));
        }
        if self.closed {
            return Err(H2Error::implementation("connection is closed"));
        }
        if !self.remote_settings.enable_push {
            return Err(H2Error::PushDisabled);
        }

        let promised_stream_id = self.next_stream_id;
        self.with_stream(stream_id, |stream, hpack| {
            stream.send_push_promise(hpack, promised_stream_id, headers, opts)
        })?;
        self.create_stream(Some(promised_stream_id), true)
            .ok_or(H2Error::PushDisabled)
    }

    pub fn ping(&mut self, data: Option<[u8; 8]>) {
        if self.closed {
            return;
        }
        self.send_frame(
            PingFrame {
                ack: false,
                data: data.unwrap_or_default(),
            }
            .into(),
        );
    }

    /// Send a SETTINGS frame and start its ACK timer.
    ///
    /// The deadline counts from the last `Instant` handed to the connection.
    pub fn send_settings(&mut self, frame: SettingsFrame) {
        if self.closed {
            return;
        }
        log::debug!("sending settings {:?}", frame.changed());
        self.pending_settings
            .push_back((frame, self.now + self.config.settings_timeout));
        self.send_frame(frame.into());
    }

    pub fn set_header_table_size(&mut self, size: u32) {
        self.send_settings(SettingsFrame {
            header_table_size: Some(size),
            ..SettingsFrame::default()
        });
    }

    pub fn set_enable_push(&mut self, enable: bool) {
        self.send_settings(SettingsFrame {
            enable_push: Some(enable),
            ..SettingsFrame::default()
        });
    }

    pub fn set_max_concurrent_streams(&mut self, max: u32) {
        self.send_settings(SettingsFrame {
            max_concurrent_streams: Some(max),
            ..SettingsFrame::default()
        });
    }

    pub fn set_initial_window_size(&mut self, size: u32) {
        self.send_settings(SettingsFrame {
            initial_window_size: Some(size),
            ..SettingsFrame::default()
        });
    }

    pub fn send_goaway(&mut self, code: ErrorCode) {
        if self.closed {
            return;
        }
        self.send_frame(
            GoAwayFrame {
                last_stream_id: self.last_stream_id,
                error_code: code,
                debug_data: Bytes::new(),
            }
            .into(),
        );
    }

    /// Graceful shutdown: GOAWAY(NO_ERROR), then close.
    pub fn destroy(&mut self) {
        self.send_goaway(ErrorCode::NO_ERROR);
        self.close(false);
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    fn fatal(&mut self, err: H2Error) {
        if self.closed {
            return;
        }
        log::warn!("connection error: {err}");
        if err != H2Error::InvalidPreface {
            self.send_goaway(err.code());
        }
        self.events.push_back(ConnectionEvent::Error(err));
        self.close(true);
    }

    fn close(&mut self, had_error: bool) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.serializer.close();
        self.flow.clear();
        self.pending_settings.clear();
        self.continuation_stream = None;

        let mut ids: Vec<u32> = self.streams.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(stream) = self.streams.get_mut(&id) {
                stream.force_close(had_error);
            }
            self.drain_stream(id);
        }

        log::debug!("connection closed (error: {had_error})");
        self.events.push_back(ConnectionEvent::Close { had_error });
    }
}
