//! h2-engine: a sans-I/O HTTP/2 protocol engine
//!
//! This crate implements the HTTP/2 wire protocol (RFC 7540) and HPACK
//! header compression (RFC 7541) without owning a socket, a clock or a
//! runtime. The caller moves bytes and time in and out; the engine keeps
//! the protocol state.
//!
//! # Features
//!
//! - **Sans-I/O Design**: No async runtime dependencies (no tokio)
//! - **Frame Codec**: All ten RFC 7540 frame types, padding and priority
//!   included; unknown frame types are skipped
//! - **HPACK**: Static and dynamic tables, Huffman coding, table size updates
//! - **Flow Control**: Signed send windows, DATA splitting, retroactive
//!   INITIAL_WINDOW_SIZE changes
//! - **Stream State Machine**: RFC 7540 Section 5.1 states with a grace
//!   period for frames racing a close
//! - **Connection**: SETTINGS negotiation with ACK timeouts, PING, GOAWAY,
//!   CONTINUATION enforcement, concurrency limits and server push
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Instant;
//! use h2_engine::{Config, Connection, ConnectionEvent, H2Header, SendOptions, Settings};
//!
//! let now = Instant::now();
//! let mut client = Connection::client(Config::default(), Settings::default(), now);
//! let mut server = Connection::server(Config::default(), Settings::default(), now);
//!
//! let id = client.create_stream(None, false).unwrap();
//! client
//!     .send_headers(id, &[H2Header::new(":method", "GET"), H2Header::new(":path", "/")],
//!         SendOptions::end_stream())
//!     .unwrap();
//!
//! // Shuttle bytes between the two ends as a transport would.
//! server.recv(&client.take_pending_send(), now).unwrap();
//! client.recv(&server.take_pending_send(), now).unwrap();
//!
//! while let Some(event) = server.poll_event() {
//!     if let ConnectionEvent::StreamEvent { stream_id, event } = event {
//!         println!("stream {stream_id}: {event:?}");
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`frame`]: frame types, parsing and serialization
//! - [`h2_codec`]: preface handling and byte-stream framing
//! - [`hpack`]: header compression contexts
//! - [`flow_control`]: send windows and the queue of held frames
//! - [`stream`]: per-stream state machine
//! - [`connection`]: multiplexing, settings and connection errors
//!
//! It does NOT provide:
//! - TCP transport or TLS (you provide the bytes)
//! - HTTP semantics (pseudo-header validation, request routing)
//! - Priority scheduling (PRIORITY is parsed and reported only)

pub mod config;
pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frame;
pub mod h2_codec;
pub mod hpack;
pub mod settings;
pub mod stream;

pub use config::{Config, MAX_HEADER_BLOCK_SIZE};
pub use connection::{Connection, ConnectionEvent, Role};
pub use error::{ErrorCode, FrameError, H2Error, HpackError};
pub use flow_control::{FlowController, FrameSink, WindowOverflow};
pub use frame::{
    flags, settings_id, ContinuationFrame, DataFrame, Frame, FrameHeader, FrameType, GoAwayFrame,
    HeadersFrame, PingFrame, PriorityFrame, PrioritySpec, PushPromiseFrame, RstStreamFrame,
    SettingsFrame, WindowUpdateFrame, FRAME_HEADER_LEN, FRAME_LEN_MAX,
};
pub use h2_codec::{is_h2c_preface, H2Codec, Serializer, CONNECTION_PREFACE};
pub use hpack::{H2Header, HpackContext};
pub use settings::{Settings, DEFAULT_INITIAL_WINDOW_SIZE};
pub use stream::{Direction, SendOptions, Stream, StreamEvent, StreamState, Transition};
