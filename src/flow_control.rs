//! Windowed send queue shared by the connection and every stream.
//!
//! Only DATA frames are subject to flow control. Everything else passes
//! straight through to the owner's [`FrameSink`], except trailing header
//! blocks, which wait behind their stream's queued DATA. Window arithmetic is signed:
//! a peer that shrinks SETTINGS_INITIAL_WINDOW_SIZE below what has already
//! been consumed drives the window negative until WINDOW_UPDATEs catch up.

use std::collections::VecDeque;

use thiserror::Error;

use crate::frame::{DataFrame, Frame, FRAME_LEN_MAX, MAX_WINDOW_SIZE};

/// Destination for frames released by a [`FlowController`].
pub trait FrameSink {
    fn send(&mut self, frame: Frame);
}

impl FrameSink for Vec<Frame> {
    fn send(&mut self, frame: Frame) {
        self.push(frame);
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("flow control window would exceed 2^31-1")]
pub struct WindowOverflow;

#[derive(Debug)]
pub struct FlowController {
    initial_window_size: u32,
    window: i64,
    queue: VecDeque<Frame>,
    /// The header block being pushed went into the queue, so its
    /// CONTINUATION frames must follow it there.
    holding_block: bool,
}

impl FlowController {
    pub fn new(initial_window_size: u32) -> Self {
        Self {
            initial_window_size,
            window: initial_window_size as i64,
            queue: VecDeque::new(),
            holding_block: false,
        }
    }

    /// Remaining send credit; negative after a peer-driven shrink.
    pub fn window(&self) -> i64 {
        self.window
    }

    pub fn initial_window_size(&self) -> u32 {
        self.initial_window_size
    }

    /// Number of frames waiting for credit.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// True if frames of `stream_id` are waiting for window.
    pub fn has_queued(&self, stream_id: u32) -> bool {
        self.queue.iter().any(|frame| frame.stream_id() == stream_id)
    }

    /// Queue DATA frames and pass every other frame straight to `sink`.
    ///
    /// A HEADERS block (trailers) for a stream that still has DATA waiting
    /// is queued behind that DATA instead, so it cannot overtake it.
    pub fn push<S: FrameSink>(&mut self, frame: Frame, sink: &mut S) {
        let hold = match &frame {
            Frame::Data(_) => true,
            Frame::Headers(headers) => {
                self.holding_block = self.has_queued(headers.stream_id);
                self.holding_block
            }
            Frame::Continuation(_) => self.holding_block,
            Frame::PushPromise(_) => {
                self.holding_block = false;
                false
            }
            _ => false,
        };

        if hold {
            self.queue.push_back(frame);
            self.flush(sink);
        } else {
            sink.send(frame);
        }
    }

    /// Release as much queued DATA as the window allows, splitting the head
    /// frame when only part of it fits.
    pub fn flush<S: FrameSink>(&mut self, sink: &mut S) {
        while let Some(head) = self.queue.front() {
            let Frame::Data(data) = head else {
                if let Some(frame) = self.queue.pop_front() {
                    sink.send(frame);
                }
                continue;
            };
            let length = data.length();

            // Empty frames (a bare END_STREAM) cost no credit.
            if length == 0 {
                if let Some(frame) = self.queue.pop_front() {
                    sink.send(frame);
                }
                continue;
            }
            if self.window <= 0 {
                break;
            }

            let budget = (FRAME_LEN_MAX as i64).min(self.window) as usize;
            if length <= budget {
                if let Some(frame) = self.queue.pop_front() {
                    self.window -= length as i64;
                    sink.send(frame);
                }
                continue;
            }

            let overhead = data.overhead();
            if overhead >= budget {
                break;
            }

            let Some(Frame::Data(mut rest)) = self.queue.pop_front() else {
                break;
            };
            let chunk = DataFrame {
                stream_id: rest.stream_id,
                data: rest.data.split_to(budget - overhead),
                end_stream: false,
                padding: rest.padding,
            };
            self.window -= chunk.length() as i64;
            log::trace!(
                "stream {} split DATA: sent {} bytes, {} queued",
                chunk.stream_id,
                chunk.data.len(),
                rest.data.len()
            );
            sink.send(chunk.into());
            self.queue.push_front(rest.into());
        }
    }

    /// Adjust the window by the difference between the new and old initial
    /// window sizes, then flush.
    pub fn update_initial_window_size<S: FrameSink>(
        &mut self,
        size: u32,
        sink: &mut S,
    ) -> Result<(), WindowOverflow> {
        let delta = size as i64 - self.initial_window_size as i64;
        if delta == 0 {
            return Ok(());
        }
        if self.window + delta > MAX_WINDOW_SIZE as i64 {
            return Err(WindowOverflow);
        }
        self.initial_window_size = size;
        self.window += delta;
        self.flush(sink);
        Ok(())
    }

    /// Credit from a WINDOW_UPDATE.
    pub fn increase_window_size<S: FrameSink>(
        &mut self,
        increment: u32,
        sink: &mut S,
    ) -> Result<(), WindowOverflow> {
        if self.window + increment as i64 > MAX_WINDOW_SIZE as i64 {
            return Err(WindowOverflow);
        }
        self.window += increment as i64;
        self.flush(sink);
        Ok(())
    }

    /// Drop every queued frame.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.holding_block = false;
    }

    /// Drop queued frames belonging to one stream.
    pub fn discard_stream(&mut self, stream_id: u32) {
        self.queue.retain(|frame| frame.stream_id() != stream_id);
    }
}
