//! HPACK: Header Compression for HTTP/2 (RFC 7541)
//!
//! One [`HpackContext`] per direction per connection. Contexts carry the
//! dynamic table across calls, so header blocks must be compressed and
//! decompressed strictly in the order their frames hit the wire.

pub mod huffman;
pub mod table;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::HpackError;

pub use table::{HeaderTable, Match, DEFAULT_HEADER_TABLE_SIZE, STATIC_TABLE};

/// Headers whose values churn too much to be worth a dynamic table slot.
const UNINDEXED_HEADERS: [&str; 5] = ["set-cookie", "content-length", "location", "etag", ":path"];

/// A decoded HTTP/2 header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H2Header {
    pub name: String,
    pub value: String,
}

impl H2Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for H2Header {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// Wire representations, keyed by their leading bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Representation {
    Indexed,
    LiteralIncremental,
    SizeUpdate,
    LiteralNeverIndexed,
    Literal,
}

impl Representation {
    fn classify(first: u8) -> Self {
        if first & 0x80 != 0 {
            Representation::Indexed
        } else if first & 0x40 != 0 {
            Representation::LiteralIncremental
        } else if first & 0x20 != 0 {
            Representation::SizeUpdate
        } else if first & 0x10 != 0 {
            Representation::LiteralNeverIndexed
        } else {
            Representation::Literal
        }
    }

    /// (prefix bits, type tag)
    fn prefix(self) -> (u8, u8) {
        match self {
            Representation::Indexed => (7, 0x80),
            Representation::LiteralIncremental => (6, 0x40),
            Representation::SizeUpdate => (5, 0x20),
            Representation::LiteralNeverIndexed => (4, 0x10),
            Representation::Literal => (4, 0x00),
        }
    }
}

/// Stateful HPACK compressor/decompressor.
#[derive(Debug, Clone)]
pub struct HpackContext {
    table: HeaderTable,
    huffman: bool,
    /// Largest table size the peer may request through a size update.
    size_limit: usize,
    /// Smallest size set since the last compress, if any change is pending.
    pending_update: Option<usize>,
}

impl Default for HpackContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HpackContext {
    pub fn new() -> Self {
        Self::with_options(true, DEFAULT_HEADER_TABLE_SIZE)
    }

    pub fn with_options(huffman: bool, table_size: usize) -> Self {
        Self {
            table: HeaderTable::new(table_size),
            huffman,
            size_limit: table_size,
            pending_update: None,
        }
    }

    /// Change the dynamic table size. On the compressing side the change is
    /// announced with a size update at the start of the next header block.
    pub fn set_header_table_size(&mut self, size: usize) {
        log::debug!("hpack table size {} -> {}", self.table.max_size(), size);
        self.table.set_max_size(size);
        self.size_limit = self.size_limit.max(size);
        self.pending_update = Some(self.pending_update.map_or(size, |low| low.min(size)));
    }

    /// Bound the sizes a peer may select with a table size update.
    pub fn set_size_limit(&mut self, limit: usize) {
        self.size_limit = limit;
    }

    pub fn table(&self) -> &HeaderTable {
        &self.table
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    pub fn table_size(&self) -> usize {
        self.table.size()
    }

    /// Encode a header list into a header block.
    pub fn compress(&mut self, headers: &[H2Header]) -> Bytes {
        let mut dst = BytesMut::new();

        if let Some(low) = self.pending_update.take() {
            let current = self.table.max_size();
            if low < current {
                encode_integer(low, Representation::SizeUpdate, &mut dst);
            }
            encode_integer(current, Representation::SizeUpdate, &mut dst);
        }

        for header in headers {
            self.compress_header(header, &mut dst);
        }
        dst.freeze()
    }

    fn compress_header(&mut self, header: &H2Header, dst: &mut BytesMut) {
        let found = self.table.find(&header.name, &header.value);
        if let Some(Match::Full(index)) = found {
            encode_integer(index, Representation::Indexed, dst);
            return;
        }

        let indexing = !UNINDEXED_HEADERS.contains(&header.name.as_str());
        let rep = if indexing {
            Representation::LiteralIncremental
        } else {
            Representation::Literal
        };

        match found {
            Some(Match::Name(index)) => encode_integer(index, rep, dst),
            _ => {
                encode_integer(0, rep, dst);
                encode_string(&header.name, self.huffman, dst);
            }
        }
        encode_string(&header.value, self.huffman, dst);

        if indexing {
            self.table.insert(header.name.clone(), header.value.clone());
        }
    }

    /// Encode a header list without reading or writing the dynamic table.
    ///
    /// For blocks that may reach the wire after blocks compressed later,
    /// such as trailers held behind flow-controlled DATA. Any pending size
    /// update stays pending for the next regular block.
    pub fn compress_unindexed(&self, headers: &[H2Header]) -> Bytes {
        let mut dst = BytesMut::new();
        for header in headers {
            let mut name_index = None;
            let mut full_index = None;
            for (i, (name, value)) in STATIC_TABLE.iter().enumerate() {
                if *name == header.name {
                    name_index.get_or_insert(i + 1);
                    if *value == header.value {
                        full_index = Some(i + 1);
                        break;
                    }
                }
            }

            if let Some(index) = full_index {
                encode_integer(index, Representation::Indexed, &mut dst);
                continue;
            }
            match name_index {
                Some(index) => encode_integer(index, Representation::Literal, &mut dst),
                None => {
                    encode_integer(0, Representation::Literal, &mut dst);
                    encode_string(&header.name, self.huffman, &mut dst);
                }
            }
            encode_string(&header.value, self.huffman, &mut dst);
        }
        dst.freeze()
    }

    /// Decode a complete header block.
    pub fn decompress(&mut self, block: &[u8]) -> Result<Vec<H2Header>, HpackError> {
        let mut buf = block;
        let mut headers = Vec::new();

        while let Some(&first) = buf.first() {
            let rep = Representation::classify(first);
            match rep {
                Representation::Indexed => {
                    let index = decode_integer(&mut buf, rep)?;
                    let (name, value) = self.table.get(index).ok_or(HpackError::InvalidIndex(index))?;
                    headers.push(H2Header::new(name, value));
                }
                Representation::SizeUpdate => {
                    if !headers.is_empty() {
                        return Err(HpackError::LateTableSizeUpdate);
                    }
                    let size = decode_integer(&mut buf, rep)?;
                    if size > self.size_limit {
                        return Err(HpackError::TableSizeExceeded {
                            size,
                            limit: self.size_limit,
                        });
                    }
                    self.table.set_max_size(size);
                }
                _ => {
                    let index = decode_integer(&mut buf, rep)?;
                    let name = if index == 0 {
                        decode_string(&mut buf)?
                    } else {
                        let (name, _) = self.table.get(index).ok_or(HpackError::InvalidIndex(index))?;
                        name.to_string()
                    };
                    let value = decode_string(&mut buf)?;
                    if rep == Representation::LiteralIncremental {
                        self.table.insert(name.clone(), value.clone());
                    }
                    headers.push(H2Header { name, value });
                }
            }
        }

        Ok(headers)
    }
}

/// Write `value` with an N-bit prefix, continuing in base-128 groups.
fn encode_integer<B: BufMut>(value: usize, rep: Representation, dst: &mut B) {
    let (bits, tag) = rep.prefix();
    encode_prefixed(value, bits, tag, dst);
}

fn decode_integer(buf: &mut &[u8], rep: Representation) -> Result<usize, HpackError> {
    decode_prefixed(buf, rep.prefix().0)
}

fn encode_prefixed<B: BufMut>(value: usize, bits: u8, tag: u8, dst: &mut B) {
    let max = (1usize << bits) - 1;
    if value < max {
        dst.put_u8(tag | value as u8);
        return;
    }

    dst.put_u8(tag | max as u8);
    let mut rest = value - max;
    while rest >= 0x80 {
        dst.put_u8((rest & 0x7f) as u8 | 0x80);
        rest >>= 7;
    }
    dst.put_u8(rest as u8);
}

fn decode_prefixed(buf: &mut &[u8], bits: u8) -> Result<usize, HpackError> {
    if !buf.has_remaining() {
        return Err(HpackError::UnexpectedEnd);
    }
    let max = (1u64 << bits) - 1;
    let mut value = buf.get_u8() as u64 & max;
    if value < max {
        return Ok(value as usize);
    }

    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(HpackError::UnexpectedEnd);
        }
        if shift > 28 {
            return Err(HpackError::IntegerOverflow);
        }
        let byte = buf.get_u8();
        value += ((byte & 0x7f) as u64) << shift;
        if value > u32::MAX as u64 {
            return Err(HpackError::IntegerOverflow);
        }
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(value as usize);
        }
    }
}

/// String literal: 7-bit length prefix whose top bit flags Huffman coding.
fn encode_string<B: BufMut>(value: &str, huffman: bool, dst: &mut B) {
    let raw = value.as_bytes();
    if huffman {
        encode_prefixed(huffman::encoded_len(raw), 7, 0x80, dst);
        huffman::encode(raw, dst);
    } else {
        encode_prefixed(raw.len(), 7, 0x00, dst);
        dst.put_slice(raw);
    }
}

fn decode_string(buf: &mut &[u8]) -> Result<String, HpackError> {
    let huffman = buf.first().is_some_and(|b| b & 0x80 != 0);
    let len = decode_prefixed(buf, 7)?;
    let data: &[u8] = buf;
    if len > data.len() {
        return Err(HpackError::UnexpectedEnd);
    }
    let (raw, rest) = data.split_at(len);
    *buf = rest;

    let bytes = if huffman {
        huffman::decode(raw)?
    } else {
        raw.to_vec()
    };
    // A lossy conversion would change the entry size the peer accounted for.
    String::from_utf8(bytes).map_err(|_| HpackError::InvalidUtf8)
}

// ============================================================================
// Tests
// ============================================================================
