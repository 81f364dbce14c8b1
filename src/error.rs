//! Error types and HTTP/2 error codes (RFC 7540 Section 7).

use std::fmt::Debug;

use thiserror::Error;

use crate::frame::FrameType;

/// An HTTP/2 error code as carried in RST_STREAM and GOAWAY frames.
///
/// Codes outside the registered range are kept verbatim so they can be
/// surfaced to the application unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ErrorCode(pub u32);

macro_rules! error_codes {
    {$($name:ident = $val:literal,)*} => {
        impl ErrorCode {
            $(pub const $name: ErrorCode = ErrorCode($val);)*

            fn name(&self) -> Option<&'static str> {
                match self.0 {
                    $($val => Some(stringify!($name)),)*
                    _ => None,
                }
            }
        }
    }
}

error_codes! {
    NO_ERROR = 0x0,
    PROTOCOL_ERROR = 0x1,
    INTERNAL_ERROR = 0x2,
    FLOW_CONTROL_ERROR = 0x3,
    SETTINGS_TIMEOUT = 0x4,
    STREAM_CLOSED = 0x5,
    FRAME_SIZE_ERROR = 0x6,
    REFUSED_STREAM = 0x7,
    CANCEL = 0x8,
    COMPRESSION_ERROR = 0x9,
    CONNECT_ERROR = 0xa,
    ENHANCE_YOUR_CALM = 0xb,
    INADEQUATE_SECURITY = 0xc,
    HTTP_1_1_REQUIRED = 0xd,
}

impl Debug for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "UNKNOWN_ERROR_CODE [{:#x}]", self.0),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        ErrorCode(code)
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.0
    }
}

/// Malformed frame payloads detected while decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown frame type {0:#x}")]
    UnknownFrameType(u8),

    #[error("{frame_type:?} frame has invalid length {length}")]
    InvalidLength { frame_type: FrameType, length: usize },

    #[error("{0:?} frame padding exceeds payload")]
    InvalidPadding(FrameType),

    #[error("{frame_type:?} frame must not be sent on stream {stream_id}")]
    InvalidStreamId { frame_type: FrameType, stream_id: u32 },

    #[error("invalid value {value} for setting {id:#x}")]
    InvalidSetting { id: u16, value: u32 },

    #[error("frame of {length} bytes exceeds maximum frame size {max}")]
    TooLarge { length: usize, max: usize },
}

impl FrameError {
    /// The error code a peer should see in the resulting GOAWAY.
    pub fn code(&self) -> ErrorCode {
        match self {
            FrameError::InvalidLength { .. } | FrameError::TooLarge { .. } => {
                ErrorCode::FRAME_SIZE_ERROR
            }
            FrameError::InvalidSetting { id: 0x4, .. } => ErrorCode::FLOW_CONTROL_ERROR,
            _ => ErrorCode::PROTOCOL_ERROR,
        }
    }
}

/// HPACK decoding failures; every one of them is a COMPRESSION_ERROR.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HpackError {
    #[error("unexpected end of header block")]
    UnexpectedEnd,

    #[error("integer overflow in header block")]
    IntegerOverflow,

    #[error("invalid header table index {0}")]
    InvalidIndex(usize),

    #[error("invalid huffman code")]
    InvalidHuffmanCode,

    #[error("invalid huffman padding")]
    InvalidHuffmanPadding,

    #[error("table size update {size} exceeds limit {limit}")]
    TableSizeExceeded { size: usize, limit: usize },

    #[error("table size update after first header field")]
    LateTableSizeUpdate,

    #[error("header field is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors raised by the protocol engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum H2Error {
    /// Fatal: the connection must be torn down with a GOAWAY carrying `code`.
    #[error("connection error {code}: {reason}")]
    Connection { code: ErrorCode, reason: String },

    /// Recoverable: only `stream_id` is reset.
    #[error("stream {stream_id} error {code}")]
    Stream { stream_id: u32, code: ErrorCode },

    /// The local application attempted something the protocol forbids.
    #[error("implementation error: {0}")]
    Implementation(String),

    #[error("unknown stream {0}")]
    UnknownStream(u32),

    #[error("server push is disabled by the peer")]
    PushDisabled,

    #[error("invalid connection preface")]
    InvalidPreface,

    #[error("header block too large ({size} bytes, max {max})")]
    HeaderBlockTooLarge { size: usize, max: usize },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Hpack(#[from] HpackError),
}

impl H2Error {
    pub fn connection(code: ErrorCode, reason: impl Into<String>) -> Self {
        H2Error::Connection {
            code,
            reason: reason.into(),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::connection(ErrorCode::PROTOCOL_ERROR, reason)
    }

    pub fn implementation(reason: impl Into<String>) -> Self {
        H2Error::Implementation(reason.into())
    }

    /// The wire error code that describes this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            H2Error::Connection { code, .. } | H2Error::Stream { code, .. } => *code,
            H2Error::Frame(err) => err.code(),
            H2Error::Hpack(_) => ErrorCode::COMPRESSION_ERROR,
            H2Error::InvalidPreface => ErrorCode::PROTOCOL_ERROR,
            H2Error::HeaderBlockTooLarge { .. } => ErrorCode::ENHANCE_YOUR_CALM,
            H2Error::Implementation(_)
            | H2Error::UnknownStream(_)
            | H2Error::PushDisabled
            | H2Error::Transport(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    /// True if the error must terminate the whole connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            H2Error::Connection { .. }
                | H2Error::Frame(_)
                | H2Error::Hpack(_)
                | H2Error::InvalidPreface
                | H2Error::HeaderBlockTooLarge { .. }
        )
    }
}
