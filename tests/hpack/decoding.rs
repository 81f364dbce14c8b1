//! Tests for HPACK decompression

use h2_engine::{HpackContext, HpackError};

use super::{headers, hex};

#[test]
fn test_decode_indexed_headers() {
    let mut ctx = HpackContext::new();

    // 0x82 = :method: GET, 0x86 = :scheme: http, 0x84 = :path: /
    let decoded = ctx.decompress(&[0x82, 0x86, 0x84]).unwrap();
    assert_eq!(
        decoded,
        headers(&[(":method", "GET"), (":scheme", "http"), (":path", "/")])
    );
}

#[test]
fn test_responses_with_eviction() {
    // RFC 7541 C.5: 256-octet table, no Huffman
    let mut ctx = HpackContext::with_options(false, 256);

    let decoded = ctx
        .decompress(&hex(
            "4803 3330 3258 0770 7269 7661 7465 611d 4d6f 6e2c 2032 3120 4f63 7420 3230 3133 \
             2032 303a 3133 3a32 3120 474d 546e 1768 7474 7073 3a2f 2f77 7777 2e65 7861 6d70 \
             6c65 2e63 6f6d",
        ))
        .unwrap();
    assert_eq!(
        decoded,
        headers(&[
            (":status", "302"),
            ("cache-control", "private"),
            ("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            ("location", "https://www.example.com"),
        ])
    );
    assert_eq!(ctx.table_size(), 222);

    let decoded = ctx.decompress(&hex("4803 3330 37c1 c0bf")).unwrap();
    assert_eq!(decoded[0], headers(&[(":status", "307")])[0]);
    assert_eq!(decoded[3].value, "https://www.example.com");
    // ":status: 302" was evicted to make room
    assert_eq!(ctx.table_len(), 4);
    assert_eq!(ctx.table_size(), 222);

    let decoded = ctx
        .decompress(&hex(
            "88c1 611d 4d6f 6e2c 2032 3120 4f63 7420 3230 3133 2032 303a 3133 3a32 3220 474d \
             54c0 5a04 677a 6970 7738 666f 6f3d 4153 444a 4b48 514b 425a 584f 5157 454f 5049 \
             5541 5851 5745 4f49 553b 206d 6178 2d61 6765 3d33 3630 303b 2076 6572 7369 6f6e \
             3d31",
        ))
        .unwrap();
    assert_eq!(decoded.len(), 6);
    assert_eq!(decoded[0].value, "200");
    assert_eq!(decoded[4].name, "content-encoding");
    assert_eq!(
        decoded[5].value,
        "foo=ASDJKHQKBZXOQWEOPIUAXQWEOIU; max-age=3600; version=1"
    );
    assert_eq!(ctx.table_len(), 3);
    assert_eq!(ctx.table_size(), 215);
}

#[test]
fn test_huffman_request_decodes() {
    // RFC 7541 C.4.1
    let mut ctx = HpackContext::new();
    let decoded = ctx
        .decompress(&hex("8286 8441 8cf1 e3c2 e5f2 3a6b a0ab 90f4 ff"))
        .unwrap();
    assert_eq!(decoded[3].name, ":authority");
    assert_eq!(decoded[3].value, "www.example.com");
}

#[test]
fn test_fluke_hpack_output_decodes() {
    let mut encoder = fluke_hpack::Encoder::new();
    let mut ctx = HpackContext::new();

    let pairs: Vec<(&[u8], &[u8])> = [
        (":method", "POST"),
        (":path", "/upload"),
        ("content-type", "application/octet-stream"),
        ("x-custom", "value"),
    ]
    .iter()
    .map(|&(name, value)| (name.as_bytes(), value.as_bytes()))
    .collect();
    for _ in 0..2 {
        let block = encoder.encode(pairs.clone());
        let decoded = ctx.decompress(&block).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[1].value, "/upload");
        assert_eq!(decoded[3].name, "x-custom");
    }
}

#[test]
fn test_index_past_table_rejected() {
    let mut ctx = HpackContext::new();
    // index 62 with an empty dynamic table
    assert_eq!(ctx.decompress(&[0x80 | 62]), Err(HpackError::InvalidIndex(62)));
}

#[test]
fn test_truncated_literal_rejected() {
    let mut ctx = HpackContext::new();
    // literal with new name, name length 6, only 3 bytes present
    assert_eq!(
        ctx.decompress(&[0x40, 0x06, b'c', b'u', b's']),
        Err(HpackError::UnexpectedEnd)
    );
}

#[test]
fn test_size_update_bounded_by_limit() {
    let mut ctx = HpackContext::new();
    ctx.set_size_limit(1024);
    // size update to 2048 (0x3f, 0xe1, 0x0f)
    assert!(matches!(
        ctx.decompress(&[0x3f, 0xe1, 0x0f]),
        Err(HpackError::TableSizeExceeded { size: 2048, limit: 1024 })
    ));
    // 1024 is accepted
    assert!(ctx.decompress(&[0x3f, 0xe1, 0x07]).unwrap().is_empty());
    assert_eq!(ctx.table().max_size(), 1024);
}
