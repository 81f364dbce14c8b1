//! Tests for frame serialization

use bytes::Bytes;
use h2_engine::{
    ContinuationFrame, DataFrame, ErrorCode, Frame, GoAwayFrame, HeadersFrame, PingFrame,
    PrioritySpec, PushPromiseFrame, SettingsFrame, WindowUpdateFrame,
};

#[test]
fn test_data_frame_bytes() {
    let frame: Frame = DataFrame {
        end_stream: true,
        ..DataFrame::new(1, &b"hello"[..])
    }
    .into();
    assert_eq!(
        &frame.to_bytes()[..],
        &[0, 0, 5, 0, 1, 0, 0, 0, 1, b'h', b'e', b'l', b'l', b'o']
    );
}

#[test]
fn test_padded_data_frame_bytes() {
    let frame: Frame = DataFrame {
        padding: Some(3),
        ..DataFrame::new(1, &b"ab"[..])
    }
    .into();
    assert_eq!(frame.length(), 6);
    assert_eq!(
        &frame.to_bytes()[..],
        &[0, 0, 6, 0, 0x08, 0, 0, 0, 1, 3, b'a', b'b', 0, 0, 0]
    );
}

#[test]
fn test_headers_frame_flags() {
    let frame: Frame = HeadersFrame {
        end_stream: true,
        priority: Some(PrioritySpec {
            exclusive: false,
            dependency: 0,
            weight: 255,
        }),
        ..HeadersFrame::new(3, Bytes::from_static(&[0x82]))
    }
    .into();
    // END_STREAM | END_HEADERS | PRIORITY
    assert_eq!(frame.flags(), 0x25);
    assert_eq!(&frame.to_bytes()[..], &[0, 0, 6, 1, 0x25, 0, 0, 0, 3, 0, 0, 0, 0, 255, 0x82]);
}

#[test]
fn test_continuation_without_end_headers() {
    let frame: Frame = ContinuationFrame {
        stream_id: 1,
        header_block: Bytes::from_static(&[0x84]),
        end_headers: false,
    }
    .into();
    assert_eq!(&frame.to_bytes()[..], &[0, 0, 1, 9, 0, 0, 0, 0, 1, 0x84]);
}

#[test]
fn test_push_promise_bytes() {
    let frame: Frame = PushPromiseFrame {
        stream_id: 1,
        promised_stream_id: 2,
        header_block: Bytes::from_static(&[0x82]),
        end_headers: true,
        padding: None,
    }
    .into();
    assert_eq!(&frame.to_bytes()[..], &[0, 0, 5, 5, 4, 0, 0, 0, 1, 0, 0, 0, 2, 0x82]);
}

#[test]
fn test_settings_only_changed_parameters() {
    let frame: Frame = SettingsFrame {
        initial_window_size: Some(1 << 20),
        ..SettingsFrame::default()
    }
    .into();
    assert_eq!(&frame.to_bytes()[..], &[0, 0, 6, 4, 0, 0, 0, 0, 0, 0, 4, 0, 0x10, 0, 0]);
    assert_eq!(&Frame::from(SettingsFrame::ack()).to_bytes()[..], &[0, 0, 0, 4, 1, 0, 0, 0, 0]);
}

#[test]
fn test_ping_ack_bytes() {
    let frame: Frame = PingFrame {
        ack: true,
        data: *b"pingpong",
    }
    .into();
    let bytes = frame.to_bytes();
    assert_eq!(&bytes[..9], &[0, 0, 8, 6, 1, 0, 0, 0, 0]);
    assert_eq!(&bytes[9..], b"pingpong");
}

#[test]
fn test_goaway_and_window_update_bytes() {
    let goaway: Frame = GoAwayFrame {
        last_stream_id: 7,
        error_code: ErrorCode::ENHANCE_YOUR_CALM,
        debug_data: Bytes::new(),
    }
    .into();
    assert_eq!(&goaway.to_bytes()[..], &[0, 0, 8, 7, 0, 0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0, 0xb]);

    let update: Frame = WindowUpdateFrame {
        stream_id: 0,
        increment: 65_535,
    }
    .into();
    assert_eq!(&update.to_bytes()[..], &[0, 0, 4, 8, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff]);
}
