//! Negotiated connection parameters (RFC 7540 Section 6.5.2).

use crate::frame::{SettingsFrame, FRAME_LEN_MAX};
use crate::hpack::DEFAULT_HEADER_TABLE_SIZE;

pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;

/// One side's view of the SETTINGS parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    /// `u32::MAX` stands for "unlimited", the protocol's initial value.
    pub max_concurrent_streams: u32,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: DEFAULT_HEADER_TABLE_SIZE as u32,
            enable_push: true,
            max_concurrent_streams: u32::MAX,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: FRAME_LEN_MAX as u32,
            max_header_list_size: None,
        }
    }
}

impl Settings {
    /// Apply the changed parameters of a SETTINGS frame.
    pub fn apply(&mut self, frame: &SettingsFrame) {
        if let Some(v) = frame.header_table_size {
            self.header_table_size = v;
        }
        if let Some(v) = frame.enable_push {
            self.enable_push = v;
        }
        if let Some(v) = frame.max_concurrent_streams {
            self.max_concurrent_streams = v;
        }
        if let Some(v) = frame.initial_window_size {
            self.initial_window_size = v;
        }
        if let Some(v) = frame.max_frame_size {
            self.max_frame_size = v;
        }
        if let Some(v) = frame.max_header_list_size {
            self.max_header_list_size = Some(v);
        }
    }

    /// A SETTINGS frame carrying every parameter of `self` that differs from `base`.
    pub fn diff(&self, base: &Settings) -> SettingsFrame {
        let changed = |a: u32, b: u32| (a != b).then_some(a);
        SettingsFrame {
            ack: false,
            header_table_size: changed(self.header_table_size, base.header_table_size),
            enable_push: (self.enable_push != base.enable_push).then_some(self.enable_push),
            max_concurrent_streams: changed(self.max_concurrent_streams, base.max_concurrent_streams),
            initial_window_size: changed(self.initial_window_size, base.initial_window_size),
            max_frame_size: changed(self.max_frame_size, base.max_frame_size),
            max_header_list_size: if self.max_header_list_size != base.max_header_list_size {
                self.max_header_list_size
            } else {
                None
            },
        }
    }
}
