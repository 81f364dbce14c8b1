//! Tests for HTTP/2 frame parsing

use bytes::Bytes;
use h2_engine::{
    flags, ErrorCode, Frame, FrameHeader, FrameType, GoAwayFrame, H2Codec, HeadersFrame,
    PrioritySpec, SettingsFrame, FRAME_HEADER_LEN,
};

fn decode(raw: &[u8]) -> Frame {
    let header = FrameHeader::parse(raw).unwrap();
    Frame::decode(&header, Bytes::copy_from_slice(&raw[FRAME_HEADER_LEN..])).unwrap()
}

#[test]
fn test_frame_header_headers() {
    // HEADERS frame, length 10, stream 3, END_HEADERS
    let header = FrameHeader::parse(&[0, 0, 10, 1, 4, 0, 0, 0, 3]).unwrap();

    assert_eq!(header.length, 10);
    assert_eq!(header.kind(), Some(FrameType::Headers));
    assert_eq!(header.stream_id, 3);
    assert!(!header.is_end_stream());
    assert!(header.is_end_headers());
}

#[test]
fn test_total_size() {
    let header = FrameHeader {
        length: 100,
        frame_type: 0,
        flags: 0,
        stream_id: 1,
    };
    assert_eq!(header.total_size(), 109); // 9 + 100
}

#[test]
fn test_padded_data_strips_padding() {
    // DATA, PADDED | END_STREAM, pad length 2
    let frame = decode(&[0, 0, 6, 0, 0x09, 0, 0, 0, 1, 2, b'a', b'b', b'c', 0, 0]);
    match frame {
        Frame::Data(data) => {
            assert_eq!(&data.data[..], b"abc");
            assert_eq!(data.padding, Some(2));
            assert!(data.end_stream);
            // padding still counts against flow control
            assert_eq!(data.length(), 6);
        }
        other => panic!("expected DATA, got {other:?}"),
    }
}

#[test]
fn test_headers_with_priority() {
    // HEADERS, END_HEADERS | PRIORITY, exclusive dependency on 1, weight 16
    let frame = decode(&[0, 0, 6, 1, 0x24, 0, 0, 0, 3, 0x80, 0, 0, 1, 15, 0x82]);
    assert_eq!(
        frame,
        Frame::Headers(HeadersFrame {
            stream_id: 3,
            header_block: Bytes::from_static(&[0x82]),
            end_stream: false,
            end_headers: true,
            priority: Some(PrioritySpec {
                exclusive: true,
                dependency: 1,
                weight: 15,
            }),
            padding: None,
        })
    );
}

#[test]
fn test_settings_parameters() {
    // HEADER_TABLE_SIZE=0, ENABLE_PUSH=0, unknown 0xff=7
    let frame = decode(&[
        0, 0, 18, 4, 0, 0, 0, 0, 0, //
        0, 1, 0, 0, 0, 0, //
        0, 2, 0, 0, 0, 0, //
        0, 0xff, 0, 0, 0, 7,
    ]);
    assert_eq!(
        frame,
        Frame::Settings(SettingsFrame {
            header_table_size: Some(0),
            enable_push: Some(false),
            ..SettingsFrame::default()
        })
    );
}

#[test]
fn test_settings_ack_flag() {
    let frame = decode(&[0, 0, 0, 4, flags::ACK, 0, 0, 0, 0]);
    assert_eq!(frame, Frame::Settings(SettingsFrame::ack()));
}

#[test]
fn test_goaway_with_debug_data() {
    let frame = decode(&[0, 0, 10, 7, 0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 1, b'h', b'i']);
    assert_eq!(
        frame,
        Frame::GoAway(GoAwayFrame {
            last_stream_id: 5,
            error_code: ErrorCode::PROTOCOL_ERROR,
            debug_data: Bytes::from_static(b"hi"),
        })
    );
}

#[test]
fn test_unknown_error_code_kept() {
    let frame = decode(&[0, 0, 4, 3, 0, 0, 0, 0, 1, 0, 0, 0, 0xff]);
    match frame {
        Frame::RstStream(rst) => {
            assert_eq!(rst.error_code, ErrorCode(0xff));
            assert_eq!(format!("{:?}", rst.error_code), "UNKNOWN_ERROR_CODE [0xff]");
        }
        other => panic!("expected RST_STREAM, got {other:?}"),
    }
}

#[test]
fn test_window_update_reserved_bit_masked() {
    let frame = decode(&[0, 0, 4, 8, 0, 0, 0, 0, 1, 0x80, 0, 0x10, 0]);
    assert_eq!(frame.stream_id(), 1);
    match frame {
        Frame::WindowUpdate(update) => assert_eq!(update.increment, 4096),
        other => panic!("expected WINDOW_UPDATE, got {other:?}"),
    }
}

#[test]
fn test_codec_handles_split_frames() {
    let mut codec = H2Codec::client();
    let raw = [0, 0, 5, 0, 1, 0, 0, 0, 1, b'h', b'e', b'l', b'l', b'o'];

    assert!(codec.process(&raw[..4]).unwrap().is_empty());
    assert!(codec.process(&raw[4..11]).unwrap().is_empty());
    let frames = codec.process(&raw[11..]).unwrap();

    assert_eq!(frames.len(), 1);
    assert!(frames[0].is_end_stream());
    assert_eq!(codec.buffered(), 0);
}
