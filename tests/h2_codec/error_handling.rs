//! Tests for malformed input

use h2_engine::{ErrorCode, FrameError, FrameType, H2Codec, H2Error};

fn process_err(raw: &[u8]) -> H2Error {
    H2Codec::client().process(raw).unwrap_err()
}

#[test]
fn test_invalid_preface() {
    let mut codec = H2Codec::server();
    let err = codec.process(b"PRI * HTTP/1.1\r\n").unwrap_err();
    assert_eq!(err, H2Error::InvalidPreface);
    assert!(err.is_connection_error());
}

#[test]
fn test_padding_exceeds_payload() {
    // DATA, PADDED, pad length 5 with only 2 octets left
    let err = process_err(&[0, 0, 3, 0, 0x08, 0, 0, 0, 1, 5, b'a', b'b']);
    assert_eq!(err, H2Error::Frame(FrameError::InvalidPadding(FrameType::Data)));
    assert_eq!(err.code(), ErrorCode::PROTOCOL_ERROR);
}

#[test]
fn test_settings_length_not_multiple_of_six() {
    let err = process_err(&[0, 0, 4, 4, 0, 0, 0, 0, 0, 0, 1, 0, 0]);
    assert_eq!(err.code(), ErrorCode::FRAME_SIZE_ERROR);
}

#[test]
fn test_settings_ack_with_payload() {
    let err = process_err(&[0, 0, 6, 4, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
    assert_eq!(err.code(), ErrorCode::FRAME_SIZE_ERROR);
}

#[test]
fn test_settings_on_stream() {
    let err = process_err(&[0, 0, 0, 4, 0, 0, 0, 0, 1]);
    assert!(matches!(
        err,
        H2Error::Frame(FrameError::InvalidStreamId { frame_type: FrameType::Settings, stream_id: 1 })
    ));
}

#[test]
fn test_invalid_setting_values() {
    // ENABLE_PUSH=2
    let err = process_err(&[0, 0, 6, 4, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 2]);
    assert_eq!(err.code(), ErrorCode::PROTOCOL_ERROR);

    // INITIAL_WINDOW_SIZE above 2^31-1
    let err = process_err(&[0, 0, 6, 4, 0, 0, 0, 0, 0, 0, 4, 0x80, 0, 0, 0]);
    assert_eq!(err.code(), ErrorCode::FLOW_CONTROL_ERROR);

    // MAX_FRAME_SIZE below 16384
    let err = process_err(&[0, 0, 6, 4, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0x10, 0]);
    assert_eq!(err.code(), ErrorCode::PROTOCOL_ERROR);
}

#[test]
fn test_fixed_length_frames() {
    // PING with 4 octets
    assert_eq!(
        process_err(&[0, 0, 4, 6, 0, 0, 0, 0, 0, 1, 2, 3, 4]).code(),
        ErrorCode::FRAME_SIZE_ERROR
    );
    // RST_STREAM with 3 octets
    assert_eq!(
        process_err(&[0, 0, 3, 3, 0, 0, 0, 0, 1, 0, 0, 8]).code(),
        ErrorCode::FRAME_SIZE_ERROR
    );
    // PRIORITY with 4 octets
    assert_eq!(
        process_err(&[0, 0, 4, 2, 0, 0, 0, 0, 1, 0, 0, 0, 0]).code(),
        ErrorCode::FRAME_SIZE_ERROR
    );
}

#[test]
fn test_goaway_too_short() {
    let err = process_err(&[0, 0, 4, 7, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(err.code(), ErrorCode::FRAME_SIZE_ERROR);
}
