//! Server push

use std::time::Instant;

use bytes::Bytes;
use h2_engine::{
    Config, Connection, ConnectionEvent, ErrorCode, Frame, FrameSink, H2Codec, H2Error, H2Header,
    PushPromiseFrame, SendOptions, Serializer, Settings, SettingsFrame, StreamEvent, StreamState,
};

use super::{drain, received_data, stream_events, Pair};

fn promise() -> Vec<H2Header> {
    vec![
        H2Header::new(":method", "GET"),
        H2Header::new(":scheme", "https"),
        H2Header::new(":path", "/style.css"),
        H2Header::new(":authority", "example.com"),
    ]
}

#[test]
fn test_server_push() {
    let mut pair = Pair::new();
    let id = pair.client.create_stream(None, false).unwrap();
    pair.client
        .send_headers(id, &[H2Header::new(":method", "GET"), H2Header::new(":path", "/")], SendOptions::end_stream())
        .unwrap();
    pair.exchange();

    let promised = pair.server.push_promise(id, &promise(), SendOptions::default()).unwrap();
    assert_eq!(promised, 2);
    assert_eq!(pair.server.stream(2).unwrap().state(), StreamState::ReservedLocal);

    pair.server
        .send_headers(promised, &[H2Header::new(":status", "200")], SendOptions::default())
        .unwrap();
    pair.server.send_data(promised, &b"body{}"[..], SendOptions::end_stream()).unwrap();
    pair.server
        .send_headers(id, &[H2Header::new(":status", "200")], SendOptions::end_stream())
        .unwrap();
    pair.exchange();

    let events = drain(&mut pair.client);
    assert!(events.contains(&ConnectionEvent::Stream(2)));
    assert!(stream_events(&events, id).contains(&StreamEvent::PushPromise {
        promised_stream_id: 2,
        headers: promise(),
    }));

    let pushed = stream_events(&events, 2);
    assert_eq!(pushed[0], StreamEvent::State(StreamState::ReservedRemote));
    assert!(pushed.contains(&StreamEvent::Headers(vec![H2Header::new(":status", "200")])));
    assert_eq!(received_data(&events, 2), b"body{}");
    assert_eq!(pushed.last(), Some(&StreamEvent::Close { had_error: false }));
    assert_eq!(pair.client.stream(2).unwrap().state(), StreamState::Closed);
    assert_eq!(pair.server.active_streams(), (0, 0));
}

#[test]
fn test_push_disabled_by_peer() {
    let mut pair = Pair::with(
        Config::default(),
        Settings {
            enable_push: false,
            ..Settings::default()
        },
        Config::default(),
        Settings::default(),
    );
    let id = pair.client.create_stream(None, false).unwrap();
    pair.client
        .send_headers(id, &[H2Header::new(":method", "GET")], SendOptions::end_stream())
        .unwrap();
    pair.exchange();

    assert_eq!(
        pair.server.push_promise(id, &promise(), SendOptions::default()),
        Err(H2Error::PushDisabled)
    );
    assert_eq!(pair.server.create_stream(None, true), None);
    assert!(!pair.server.is_closed());
}

#[test]
fn test_client_cannot_push() {
    let mut pair = Pair::new();
    let id = pair.client.create_stream(None, false).unwrap();
    assert!(matches!(
        pair.client.push_promise(id, &promise(), SendOptions::default()),
        Err(H2Error::Implementation(_))
    ));
}

#[test]
fn test_unwanted_push_promise_is_fatal() {
    let now = Instant::now();
    let settings = Settings {
        enable_push: false,
        ..Settings::default()
    };
    let mut client = Connection::client(Config::default(), settings, now);
    let mut codec = H2Codec::server();
    let mut out = Serializer::new();

    let frames = codec.process(&client.take_pending_send()).unwrap();
    assert_eq!(
        frames,
        vec![Frame::Settings(SettingsFrame {
            enable_push: Some(false),
            ..SettingsFrame::default()
        })]
    );
    out.send(SettingsFrame::default().into());
    out.send(SettingsFrame::ack().into());
    client.recv(&out.take(), now).unwrap();
    assert!(!client.local_settings().enable_push);

    let id = client.create_stream(None, false).unwrap();
    client
        .send_headers(id, &[H2Header::new(":method", "GET")], SendOptions::end_stream())
        .unwrap();
    codec.process(&client.take_pending_send()).unwrap();

    out.send(
        PushPromiseFrame {
            stream_id: id,
            promised_stream_id: 2,
            header_block: Bytes::from_static(&[0x82]),
            end_headers: true,
            padding: None,
        }
        .into(),
    );
    let err = client.recv(&out.take(), now).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PROTOCOL_ERROR);
    assert!(client.is_closed());
}
