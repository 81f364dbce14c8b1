//! Engine tunables that are not negotiated with the peer.

use std::time::Duration;

/// Maximum accumulated header block size (256 KB).
/// Prevents unbounded memory growth from malicious/buggy CONTINUATION floods.
pub const MAX_HEADER_BLOCK_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// How long a sent SETTINGS frame may stay unacknowledged.
    pub settings_timeout: Duration,
    /// Delay between a stream reaching `closed` and becoming removable.
    pub stream_close_grace: Duration,
    /// Huffman-code string literals when compressing headers.
    pub huffman: bool,
    pub max_header_block_size: usize,
    /// Sweep fully closed streams once the table holds more than this many.
    pub stream_cleanup_threshold: usize,
    /// Return receive-window credit for every DATA frame as it arrives.
    pub auto_window_update: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_timeout: Duration::from_secs(30),
            stream_close_grace: Duration::from_secs(1),
            huffman: true,
            max_header_block_size: MAX_HEADER_BLOCK_SIZE,
            stream_cleanup_threshold: 50,
            auto_window_update: true,
        }
    }
}
