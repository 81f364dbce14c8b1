//! Tests for HPACK compression

use h2_engine::HpackContext;

use super::{headers, hex};

#[test]
fn test_requests_without_huffman() {
    // RFC 7541 C.3
    let mut ctx = HpackContext::with_options(false, 4096);

    let block = ctx.compress(&headers(&[
        (":method", "GET"),
        (":scheme", "http"),
        (":path", "/"),
        (":authority", "www.example.com"),
    ]));
    assert_eq!(&block[..], &hex("8286 8441 0f77 7777 2e65 7861 6d70 6c65 2e63 6f6d")[..]);
    assert_eq!(ctx.table_size(), 57);

    let block = ctx.compress(&headers(&[
        (":method", "GET"),
        (":scheme", "http"),
        (":path", "/"),
        (":authority", "www.example.com"),
        ("cache-control", "no-cache"),
    ]));
    assert_eq!(&block[..], &hex("8286 84be 5808 6e6f 2d63 6163 6865")[..]);
    assert_eq!(ctx.table_size(), 110);

    let block = ctx.compress(&headers(&[
        (":method", "GET"),
        (":scheme", "https"),
        (":path", "/index.html"),
        (":authority", "www.example.com"),
        ("custom-key", "custom-value"),
    ]));
    assert_eq!(
        &block[..],
        &hex("8287 85bf 400a 6375 7374 6f6d 2d6b 6579 0c63 7573 746f 6d2d 7661 6c75 65")[..]
    );
    assert_eq!(ctx.table_len(), 3);
    assert_eq!(ctx.table_size(), 164);
}

#[test]
fn test_requests_with_huffman() {
    // RFC 7541 C.4
    let mut ctx = HpackContext::with_options(true, 4096);

    let block = ctx.compress(&headers(&[
        (":method", "GET"),
        (":scheme", "http"),
        (":path", "/"),
        (":authority", "www.example.com"),
    ]));
    assert_eq!(&block[..], &hex("8286 8441 8cf1 e3c2 e5f2 3a6b a0ab 90f4 ff")[..]);

    let block = ctx.compress(&headers(&[
        (":method", "GET"),
        (":scheme", "http"),
        (":path", "/"),
        (":authority", "www.example.com"),
        ("cache-control", "no-cache"),
    ]));
    assert_eq!(&block[..], &hex("8286 84be 5886 a8eb 1064 9cbf")[..]);

    let block = ctx.compress(&headers(&[
        (":method", "GET"),
        (":scheme", "https"),
        (":path", "/index.html"),
        (":authority", "www.example.com"),
        ("custom-key", "custom-value"),
    ]));
    assert_eq!(
        &block[..],
        &hex("8287 85bf 4088 25a8 49e9 5ba9 7d7f 8925 a849 e95b b8e8 b4bf")[..]
    );
}

#[test]
fn test_churning_headers_stay_out_of_table() {
    let mut ctx = HpackContext::with_options(false, 4096);
    ctx.compress(&headers(&[
        ("set-cookie", "id=1"),
        ("content-length", "12"),
        (":path", "/search?q=1"),
    ]));
    assert_eq!(ctx.table_len(), 0);
}

#[test]
fn test_repeated_header_uses_dynamic_index() {
    let mut ctx = HpackContext::with_options(false, 4096);
    let list = headers(&[("x-trace", "abc")]);
    ctx.compress(&list);
    // first dynamic entry sits at index 62
    assert_eq!(&ctx.compress(&list)[..], &[0x80 | 62]);
}

#[test]
fn test_table_resize_announced_in_next_block() {
    let mut ctx = HpackContext::with_options(false, 4096);
    ctx.set_header_table_size(0);
    ctx.set_header_table_size(1024);

    let block = ctx.compress(&headers(&[(":method", "GET")]));
    // size update 0, size update 1024, then :method GET
    assert_eq!(&block[..], &[0x20, 0x3f, 0xe1, 0x07, 0x82]);

    let block = ctx.compress(&headers(&[(":method", "GET")]));
    assert_eq!(&block[..], &[0x82]);
}

#[test]
fn test_output_decodes_with_fluke_hpack() {
    let mut ctx = HpackContext::new();
    let mut reference = fluke_hpack::Decoder::new();

    for round in 0..3 {
        let list = headers(&[
            (":status", "200"),
            ("content-type", "application/json"),
            ("x-request-id", "7f3c9a"),
            ("set-cookie", "session=abc"),
        ]);
        let block = ctx.compress(&list);
        let decoded = reference.decode(&block).unwrap();
        let names: Vec<_> = decoded
            .iter()
            .map(|(name, value)| {
                (
                    String::from_utf8_lossy(name).into_owned(),
                    String::from_utf8_lossy(value).into_owned(),
                )
            })
            .collect();
        let expected: Vec<_> = list
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        assert_eq!(names, expected, "round {round}");
    }
}
