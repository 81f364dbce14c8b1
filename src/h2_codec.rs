//! Byte-stream glue between the transport and the frame codec.
//!
//! [`H2Codec`] buffers raw input, checks the client connection preface and
//! cuts complete frames off the front of the buffer. [`Serializer`] is the
//! outbound half: it encodes frames into a byte buffer the caller drains
//! and writes to the socket.
//!
//! Reference: RFC 7540 Sections 3.5 and 4.1

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{FrameError, H2Error};
use crate::flow_control::FrameSink;
use crate::frame::{Frame, FrameHeader, FRAME_HEADER_LEN, FRAME_LEN_MAX};

/// The HTTP/2 connection preface (24 bytes)
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Check if data starts with HTTP/2 connection preface (h2c detection)
pub fn is_h2c_preface(data: &[u8]) -> bool {
    data.starts_with(CONNECTION_PREFACE)
}

/// Incremental frame reader.
#[derive(Debug)]
pub struct H2Codec {
    /// Buffer for incomplete frames
    buffer: BytesMut,
    /// Connection preface received (always true on the client side)
    preface_received: bool,
    expect_preface: bool,
    /// Largest payload accepted before FRAME_SIZE_ERROR.
    max_frame_size: usize,
}

impl H2Codec {
    /// Reader for a client: the server sends no preface.
    pub fn client() -> Self {
        Self::new(false)
    }

    /// Reader for a server: input must start with the connection preface.
    pub fn server() -> Self {
        Self::new(true)
    }

    fn new(expect_preface: bool) -> Self {
        Self {
            buffer: BytesMut::new(),
            preface_received: !expect_preface,
            expect_preface,
            max_frame_size: FRAME_LEN_MAX,
        }
    }

    pub fn preface_received(&self) -> bool {
        self.preface_received
    }

    pub fn set_max_frame_size(&mut self, size: usize) {
        self.max_frame_size = size;
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Check the connection preface as far as it has arrived.
    ///
    /// Returns `Ok(true)` once the whole preface has been seen and consumed.
    fn check_preface(&mut self) -> Result<bool, H2Error> {
        let seen = self.buffer.len().min(CONNECTION_PREFACE.len());
        if self.buffer[..seen] != CONNECTION_PREFACE[..seen] {
            return Err(H2Error::InvalidPreface);
        }
        if seen < CONNECTION_PREFACE.len() {
            return Ok(false);
        }
        self.buffer.advance(CONNECTION_PREFACE.len());
        self.preface_received = true;
        log::debug!("connection preface received");
        Ok(true)
    }

    /// Cut the next complete frame off the buffer.
    ///
    /// `Ok(None)` means more input is needed. Frames of unknown type are
    /// skipped; every other decoding failure is fatal.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, H2Error> {
        if !self.preface_received && !self.check_preface()? {
            return Ok(None);
        }

        loop {
            let header = match FrameHeader::parse(&self.buffer) {
                Some(h) => h,
                None => return Ok(None),
            };

            // Reject oversized frames before waiting for their payload.
            if header.length as usize > self.max_frame_size {
                return Err(FrameError::TooLarge {
                    length: header.length as usize,
                    max: self.max_frame_size,
                }
                .into());
            }

            let total_size = header.total_size();
            if self.buffer.len() < total_size {
                return Ok(None);
            }

            let mut raw = self.buffer.split_to(total_size);
            raw.advance(FRAME_HEADER_LEN);
            let payload: Bytes = raw.freeze();

            if header.kind().is_none() {
                log::debug!(
                    "skipping unknown frame type {:#x} ({} bytes) on stream {}",
                    header.frame_type,
                    header.length,
                    header.stream_id
                );
                continue;
            }

            let frame = Frame::decode(&header, payload)?;
            log::trace!("recv {:?}", frame);
            return Ok(Some(frame));
        }
    }

    /// Feed raw bytes and collect every complete frame.
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<Frame>, H2Error> {
        self.extend(data);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Reset codec state (e.g., after upstream reconnect)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.preface_received = !self.expect_preface;
        self.max_frame_size = FRAME_LEN_MAX;
    }
}

/// Outbound frame writer.
#[derive(Debug, Default)]
pub struct Serializer {
    buf: BytesMut,
    closed: bool,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write raw bytes (the client preface).
    pub fn write_raw(&mut self, data: &[u8]) {
        if !self.closed {
            self.buf.extend_from_slice(data);
        }
    }

    /// Stop writing; later frames are dropped.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Hand out everything serialized so far.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl FrameSink for Serializer {
    fn send(&mut self, frame: Frame) {
        if self.closed {
            log::trace!("dropping {:?} on closed connection", frame.frame_type());
            return;
        }
        log::trace!("send {:?}", frame);
        frame.encode(&mut self.buf);
    }
}

// ============================================================================
// Tests
// ============================================================================
