//! HTTP/2 frame codec.
//!
//! Maps the ten frame types of RFC 7540 Section 6 between typed structures
//! and the 9-byte-header + payload wire format. Flags and lengths are always
//! derived from the frame's fields at encode time, never cached.
//!
//! The codec never splits: callers must keep payloads within
//! [`FRAME_LEN_MAX`]. Splitting DATA is the flow controller's job, splitting
//! header blocks is the stream's.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ErrorCode, FrameError};

/// Size of the fixed frame header.
pub const FRAME_HEADER_LEN: usize = 9;

/// Largest frame payload this engine emits or accepts (2^14).
pub const FRAME_LEN_MAX: usize = 16_384;

/// Upper bound a peer may advertise for SETTINGS_MAX_FRAME_SIZE (2^24 - 1).
pub const MAX_FRAME_SIZE_UPPER: u32 = (1 << 24) - 1;

/// Largest legal flow-control window (2^31 - 1).
pub const MAX_WINDOW_SIZE: u32 = 0x7fff_ffff;

const STREAM_ID_MASK: u32 = 0x7fff_ffff;

/// HTTP/2 frame flags
#[allow(dead_code)]
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// HTTP/2 SETTINGS identifiers (RFC 7540 Section 6.5.2)
#[allow(dead_code)]
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// HTTP/2 frame types (RFC 7540 Section 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

impl FrameType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::GoAway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            _ => return None,
        })
    }

    /// Frame types that are only meaningful on a non-zero stream.
    pub fn is_stream_scoped(self) -> bool {
        matches!(
            self,
            FrameType::Data
                | FrameType::Headers
                | FrameType::Priority
                | FrameType::RstStream
                | FrameType::PushPromise
                | FrameType::Continuation
        )
    }
}

/// A parsed HTTP/2 frame header (9 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32, // 24 bits
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32, // 31 bits (high bit reserved)
}

impl FrameHeader {
    /// Parse a 9-byte frame header
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FRAME_HEADER_LEN {
            return None;
        }

        let length = ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32);
        let stream_id = u32::from_be_bytes([data[5], data[6], data[7], data[8]]) & STREAM_ID_MASK;

        Some(Self {
            length,
            frame_type: data[3],
            flags: data[4],
            stream_id,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_uint(self.length as u64, 3);
        dst.put_u8(self.frame_type);
        dst.put_u8(self.flags);
        dst.put_u32(self.stream_id & STREAM_ID_MASK);
    }

    /// Total frame size including header
    pub fn total_size(&self) -> usize {
        FRAME_HEADER_LEN + self.length as usize
    }

    pub fn kind(&self) -> Option<FrameType> {
        FrameType::from_u8(self.frame_type)
    }

    /// Check if END_STREAM flag is set
    pub fn is_end_stream(&self) -> bool {
        self.flags & flags::END_STREAM != 0
    }

    /// Check if END_HEADERS flag is set
    pub fn is_end_headers(&self) -> bool {
        self.flags & flags::END_HEADERS != 0
    }
}

/// Stream dependency carried by PRIORITY frames and prioritised HEADERS.
///
/// `weight` is the raw wire octet, i.e. the effective weight minus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrioritySpec {
    pub exclusive: bool,
    pub dependency: u32,
    pub weight: u8,
}

impl PrioritySpec {
    const LEN: usize = 5;

    fn decode(buf: &mut Bytes) -> Self {
        let raw = buf.get_u32();
        Self {
            exclusive: raw & !STREAM_ID_MASK != 0,
            dependency: raw & STREAM_ID_MASK,
            weight: buf.get_u8(),
        }
    }

    fn encode<B: BufMut>(&self, dst: &mut B) {
        let mut raw = self.dependency & STREAM_ID_MASK;
        if self.exclusive {
            raw |= !STREAM_ID_MASK;
        }
        dst.put_u32(raw);
        dst.put_u8(self.weight);
    }
}

fn padded_len(body: usize, padding: Option<u8>) -> usize {
    match padding {
        Some(pad) => 1 + body + pad as usize,
        None => body,
    }
}

/// Remove the pad-length octet and trailing padding, returning the pad count.
fn strip_padding(
    frame_type: FrameType,
    header: &FrameHeader,
    payload: &mut Bytes,
) -> Result<Option<u8>, FrameError> {
    if header.flags & flags::PADDED == 0 {
        return Ok(None);
    }
    if payload.is_empty() {
        return Err(FrameError::InvalidPadding(frame_type));
    }
    let pad = payload.get_u8();
    if pad as usize > payload.len() {
        return Err(FrameError::InvalidPadding(frame_type));
    }
    payload.truncate(payload.len() - pad as usize);
    Ok(Some(pad))
}

fn put_padded<B: BufMut>(dst: &mut B, padding: Option<u8>, body: impl FnOnce(&mut B)) {
    if let Some(pad) = padding {
        dst.put_u8(pad);
    }
    body(dst);
    if let Some(pad) = padding {
        dst.put_bytes(0, pad as usize);
    }
}

fn expect_len(frame_type: FrameType, payload: &Bytes, len: usize) -> Result<(), FrameError> {
    if payload.len() != len {
        return Err(FrameError::InvalidLength {
            frame_type,
            length: payload.len(),
        });
    }
    Ok(())
}

fn expect_connection_scope(frame_type: FrameType, header: &FrameHeader) -> Result<(), FrameError> {
    if header.stream_id != 0 {
        return Err(FrameError::InvalidStreamId {
            frame_type,
            stream_id: header.stream_id,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub stream_id: u32,
    pub data: Bytes,
    pub end_stream: bool,
    pub padding: Option<u8>,
}

impl DataFrame {
    pub fn new(stream_id: u32, data: impl Into<Bytes>) -> Self {
        Self {
            stream_id,
            data: data.into(),
            end_stream: false,
            padding: None,
        }
    }

    pub fn length(&self) -> usize {
        padded_len(self.data.len(), self.padding)
    }

    /// Octets of the payload that are not application data.
    pub fn overhead(&self) -> usize {
        self.length() - self.data.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersFrame {
    pub stream_id: u32,
    pub header_block: Bytes,
    pub end_stream: bool,
    pub end_headers: bool,
    pub priority: Option<PrioritySpec>,
    pub padding: Option<u8>,
}

impl HeadersFrame {
    pub fn new(stream_id: u32, header_block: impl Into<Bytes>) -> Self {
        Self {
            stream_id,
            header_block: header_block.into(),
            end_stream: false,
            end_headers: true,
            priority: None,
            padding: None,
        }
    }

    pub fn length(&self) -> usize {
        let priority = if self.priority.is_some() { PrioritySpec::LEN } else { 0 };
        padded_len(priority + self.header_block.len(), self.padding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityFrame {
    pub stream_id: u32,
    pub priority: PrioritySpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RstStreamFrame {
    pub stream_id: u32,
    pub error_code: ErrorCode,
}

/// SETTINGS frame; `Some` marks a parameter as changed.
///
/// Only changed parameters are serialized, and the connection applies only
/// the changed ones on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsFrame {
    pub ack: bool,
    pub header_table_size: Option<u32>,
    pub enable_push: Option<bool>,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub max_header_list_size: Option<u32>,
}

impl SettingsFrame {
    pub fn ack() -> Self {
        Self {
            ack: true,
            ..Self::default()
        }
    }

    /// The changed parameters as (identifier, value) pairs, in identifier order.
    pub fn changed(&self) -> Vec<(u16, u32)> {
        let mut params = Vec::new();
        if let Some(v) = self.header_table_size {
            params.push((settings_id::HEADER_TABLE_SIZE, v));
        }
        if let Some(v) = self.enable_push {
            params.push((settings_id::ENABLE_PUSH, v as u32));
        }
        if let Some(v) = self.max_concurrent_streams {
            params.push((settings_id::MAX_CONCURRENT_STREAMS, v));
        }
        if let Some(v) = self.initial_window_size {
            params.push((settings_id::INITIAL_WINDOW_SIZE, v));
        }
        if let Some(v) = self.max_frame_size {
            params.push((settings_id::MAX_FRAME_SIZE, v));
        }
        if let Some(v) = self.max_header_list_size {
            params.push((settings_id::MAX_HEADER_LIST_SIZE, v));
        }
        params
    }

    pub fn is_empty(&self) -> bool {
        self.changed().is_empty()
    }

    pub fn length(&self) -> usize {
        self.changed().len() * 6
    }

    fn set(&mut self, id: u16, value: u32) -> Result<(), FrameError> {
        let invalid = FrameError::InvalidSetting { id, value };
        match id {
            settings_id::HEADER_TABLE_SIZE => self.header_table_size = Some(value),
            settings_id::ENABLE_PUSH => match value {
                0 => self.enable_push = Some(false),
                1 => self.enable_push = Some(true),
                _ => return Err(invalid),
            },
            settings_id::MAX_CONCURRENT_STREAMS => self.max_concurrent_streams = Some(value),
            settings_id::INITIAL_WINDOW_SIZE => {
                if value > MAX_WINDOW_SIZE {
                    return Err(invalid);
                }
                self.initial_window_size = Some(value);
            }
            settings_id::MAX_FRAME_SIZE => {
                if !(FRAME_LEN_MAX as u32..=MAX_FRAME_SIZE_UPPER).contains(&value) {
                    return Err(invalid);
                }
                self.max_frame_size = Some(value);
            }
            settings_id::MAX_HEADER_LIST_SIZE => self.max_header_list_size = Some(value),
            _ => log::trace!("ignoring unknown setting {id:#x}={value}"),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPromiseFrame {
    pub stream_id: u32,
    pub promised_stream_id: u32,
    pub header_block: Bytes,
    pub end_headers: bool,
    pub padding: Option<u8>,
}

impl PushPromiseFrame {
    pub fn length(&self) -> usize {
        padded_len(4 + self.header_block.len(), self.padding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingFrame {
    pub ack: bool,
    pub data: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoAwayFrame {
    pub last_stream_id: u32,
    pub error_code: ErrorCode,
    pub debug_data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    pub stream_id: u32,
    pub increment: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationFrame {
    pub stream_id: u32,
    pub header_block: Bytes,
    pub end_headers: bool,
}

/// A decoded HTTP/2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(DataFrame),
    Headers(HeadersFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    GoAway(GoAwayFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame),
}

macro_rules! frame_from {
    {$($variant:ident($ty:ty),)*} => {
        $(impl From<$ty> for Frame {
            fn from(frame: $ty) -> Self {
                Frame::$variant(frame)
            }
        })*
    }
}

frame_from! {
    Data(DataFrame),
    Headers(HeadersFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    GoAway(GoAwayFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame),
}

impl Frame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Data(_) => FrameType::Data,
            Frame::Headers(_) => FrameType::Headers,
            Frame::Priority(_) => FrameType::Priority,
            Frame::RstStream(_) => FrameType::RstStream,
            Frame::Settings(_) => FrameType::Settings,
            Frame::PushPromise(_) => FrameType::PushPromise,
            Frame::Ping(_) => FrameType::Ping,
            Frame::GoAway(_) => FrameType::GoAway,
            Frame::WindowUpdate(_) => FrameType::WindowUpdate,
            Frame::Continuation(_) => FrameType::Continuation,
        }
    }

    pub fn stream_id(&self) -> u32 {
        match self {
            Frame::Data(f) => f.stream_id,
            Frame::Headers(f) => f.stream_id,
            Frame::Priority(f) => f.stream_id,
            Frame::RstStream(f) => f.stream_id,
            Frame::PushPromise(f) => f.stream_id,
            Frame::WindowUpdate(f) => f.stream_id,
            Frame::Continuation(f) => f.stream_id,
            Frame::Settings(_) | Frame::Ping(_) | Frame::GoAway(_) => 0,
        }
    }

    /// Payload length, excluding the 9-byte header.
    pub fn length(&self) -> usize {
        match self {
            Frame::Data(f) => f.length(),
            Frame::Headers(f) => f.length(),
            Frame::Priority(_) => PrioritySpec::LEN,
            Frame::RstStream(_) | Frame::WindowUpdate(_) => 4,
            Frame::Settings(f) => f.length(),
            Frame::PushPromise(f) => f.length(),
            Frame::Ping(_) => 8,
            Frame::GoAway(f) => 8 + f.debug_data.len(),
            Frame::Continuation(f) => f.header_block.len(),
        }
    }

    /// Flags recomputed from the frame's current fields.
    pub fn flags(&self) -> u8 {
        let bit = |set: bool, flag: u8| if set { flag } else { 0 };
        match self {
            Frame::Data(f) => {
                bit(f.end_stream, flags::END_STREAM) | bit(f.padding.is_some(), flags::PADDED)
            }
            Frame::Headers(f) => {
                bit(f.end_stream, flags::END_STREAM)
                    | bit(f.end_headers, flags::END_HEADERS)
                    | bit(f.padding.is_some(), flags::PADDED)
                    | bit(f.priority.is_some(), flags::PRIORITY)
            }
            Frame::PushPromise(f) => {
                bit(f.end_headers, flags::END_HEADERS) | bit(f.padding.is_some(), flags::PADDED)
            }
            Frame::Continuation(f) => bit(f.end_headers, flags::END_HEADERS),
            Frame::Settings(f) => bit(f.ack, flags::ACK),
            Frame::Ping(f) => bit(f.ack, flags::ACK),
            Frame::Priority(_) | Frame::RstStream(_) | Frame::GoAway(_) | Frame::WindowUpdate(_) => 0,
        }
    }

    pub fn is_end_stream(&self) -> bool {
        match self {
            Frame::Data(f) => f.end_stream,
            Frame::Headers(f) => f.end_stream,
            _ => false,
        }
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            length: self.length() as u32,
            frame_type: self.frame_type() as u8,
            flags: self.flags(),
            stream_id: self.stream_id(),
        }
    }

    /// Decode a frame from its parsed header and complete payload.
    pub fn decode(header: &FrameHeader, mut payload: Bytes) -> Result<Frame, FrameError> {
        let frame_type =
            FrameType::from_u8(header.frame_type).ok_or(FrameError::UnknownFrameType(header.frame_type))?;
        let stream_id = header.stream_id;

        let frame = match frame_type {
            FrameType::Data => {
                let padding = strip_padding(frame_type, header, &mut payload)?;
                Frame::Data(DataFrame {
                    stream_id,
                    data: payload,
                    end_stream: header.is_end_stream(),
                    padding,
                })
            }
            FrameType::Headers => {
                let padding = strip_padding(frame_type, header, &mut payload)?;
                let priority = if header.flags & flags::PRIORITY != 0 {
                    if payload.len() < PrioritySpec::LEN {
                        return Err(FrameError::InvalidLength {
                            frame_type,
                            length: header.length as usize,
                        });
                    }
                    Some(PrioritySpec::decode(&mut payload))
                } else {
                    None
                };
                Frame::Headers(HeadersFrame {
                    stream_id,
                    header_block: payload,
                    end_stream: header.is_end_stream(),
                    end_headers: header.is_end_headers(),
                    priority,
                    padding,
                })
            }
            FrameType::Priority => {
                expect_len(frame_type, &payload, PrioritySpec::LEN)?;
                Frame::Priority(PriorityFrame {
                    stream_id,
                    priority: PrioritySpec::decode(&mut payload),
                })
            }
            FrameType::RstStream => {
                expect_len(frame_type, &payload, 4)?;
                Frame::RstStream(RstStreamFrame {
                    stream_id,
                    error_code: ErrorCode(payload.get_u32()),
                })
            }
            FrameType::Settings => {
                expect_connection_scope(frame_type, header)?;
                let ack = header.flags & flags::ACK != 0;
                if payload.len() % 6 != 0 || (ack && !payload.is_empty()) {
                    return Err(FrameError::InvalidLength {
                        frame_type,
                        length: payload.len(),
                    });
                }
                let mut settings = SettingsFrame {
                    ack,
                    ..SettingsFrame::default()
                };
                while payload.has_remaining() {
                    let id = payload.get_u16();
                    let value = payload.get_u32();
                    settings.set(id, value)?;
                }
                Frame::Settings(settings)
            }
            FrameType::PushPromise => {
                let padding = strip_padding(frame_type, header, &mut payload)?;
                if payload.len() < 4 {
                    return Err(FrameError::InvalidLength {
                        frame_type,
                        length: header.length as usize,
                    });
                }
                let promised_stream_id = payload.get_u32() & STREAM_ID_MASK;
                Frame::PushPromise(PushPromiseFrame {
                    stream_id,
                    promised_stream_id,
                    header_block: payload,
                    end_headers: header.is_end_headers(),
                    padding,
                })
            }
            FrameType::Ping => {
                expect_connection_scope(frame_type, header)?;
                expect_len(frame_type, &payload, 8)?;
                let mut data = [0u8; 8];
                payload.copy_to_slice(&mut data);
                Frame::Ping(PingFrame {
                    ack: header.flags & flags::ACK != 0,
                    data,
                })
            }
            FrameType::GoAway => {
                expect_connection_scope(frame_type, header)?;
                if payload.len() < 8 {
                    return Err(FrameError::InvalidLength {
                        frame_type,
                        length: payload.len(),
                    });
                }
                let last_stream_id = payload.get_u32() & STREAM_ID_MASK;
                let error_code = ErrorCode(payload.get_u32());
                Frame::GoAway(GoAwayFrame {
                    last_stream_id,
                    error_code,
                    debug_data: payload,
                })
            }
            FrameType::WindowUpdate => {
                expect_len(frame_type, &payload, 4)?;
                Frame::WindowUpdate(WindowUpdateFrame {
                    stream_id,
                    increment: payload.get_u32() & STREAM_ID_MASK,
                })
            }
            FrameType::Continuation => Frame::Continuation(ContinuationFrame {
                stream_id,
                header_block: payload,
                end_headers: header.is_end_headers(),
            }),
        };
        Ok(frame)
    }

    /// Append the wire form of this frame to `dst`.
    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        debug_assert!(self.length() <= MAX_FRAME_SIZE_UPPER as usize);
        self.header().encode(dst);

        match self {
            Frame::Data(f) => put_padded(dst, f.padding, |dst| dst.put_slice(&f.data)),
            Frame::Headers(f) => put_padded(dst, f.padding, |dst| {
                if let Some(priority) = &f.priority {
                    priority.encode(dst);
                }
                dst.put_slice(&f.header_block);
            }),
            Frame::Priority(f) => f.priority.encode(dst),
            Frame::RstStream(f) => dst.put_u32(f.error_code.0),
            Frame::Settings(f) => {
                for (id, value) in f.changed() {
                    dst.put_u16(id);
                    dst.put_u32(value);
                }
            }
            Frame::PushPromise(f) => put_padded(dst, f.padding, |dst| {
                dst.put_u32(f.promised_stream_id & STREAM_ID_MASK);
                dst.put_slice(&f.header_block);
            }),
            Frame::Ping(f) => dst.put_slice(&f.data),
            Frame::GoAway(f) => {
                dst.put_u32(f.last_stream_id & STREAM_ID_MASK);
                dst.put_u32(f.error_code.0);
                dst.put_slice(&f.debug_data);
            }
            Frame::WindowUpdate(f) => dst.put_u32(f.increment & STREAM_ID_MASK),
            Frame::Continuation(f) => dst.put_slice(&f.header_block),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + self.length());
        self.encode(&mut buf);
        buf.freeze()
    }
}
