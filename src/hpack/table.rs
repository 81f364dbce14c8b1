//! Static and dynamic header tables (RFC 7541 Section 2.3).

use std::collections::VecDeque;

/// Per-entry accounting overhead.
pub const ENTRY_OVERHEAD: usize = 32;

pub const DEFAULT_HEADER_TABLE_SIZE: usize = 4096;

pub static STATIC_TABLE: [(&str, &str); 61] = [
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

pub fn entry_size(name: &str, value: &str) -> usize {
    ENTRY_OVERHEAD + name.len() + value.len()
}

/// Result of looking a header up in the combined index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Name and value both match the entry at this index.
    Full(usize),
    /// Only the name matches.
    Name(usize),
}

/// Combined static + dynamic table; indices 1..=61 are static, 62.. dynamic
/// with the most recently inserted entry first.
#[derive(Debug, Clone)]
pub struct HeaderTable {
    entries: VecDeque<(String, String)>,
    size: usize,
    max_size: usize,
}

impl Default for HeaderTable {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_TABLE_SIZE)
    }
}

impl HeaderTable {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry sizes currently held in the dynamic table.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the maximum size, evicting the oldest entries until it fits.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_to(max_size);
    }

    /// Resolve a 1-based index.
    pub fn get(&self, index: usize) -> Option<(&str, &str)> {
        match index {
            0 => None,
            1..=61 => Some(STATIC_TABLE[index - 1]),
            _ => self
                .entries
                .get(index - STATIC_TABLE.len() - 1)
                .map(|(name, value)| (name.as_str(), value.as_str())),
        }
    }

    /// Look up a header, static entries first.
    ///
    /// The first exact match wins. Otherwise the first name match seen in
    /// the static table is kept, unless an exact dynamic match turns up.
    pub fn find(&self, name: &str, value: &str) -> Option<Match> {
        let mut candidate = None;

        for (i, &(n, v)) in STATIC_TABLE.iter().enumerate() {
            if n == name {
                if v == value {
                    return Some(Match::Full(i + 1));
                }
                candidate.get_or_insert(Match::Name(i + 1));
            }
        }

        for (i, (n, v)) in self.entries.iter().enumerate() {
            if n == name {
                let index = i + STATIC_TABLE.len() + 1;
                if v == value {
                    return Some(Match::Full(index));
                }
                candidate.get_or_insert(Match::Name(index));
            }
        }

        candidate
    }

    /// Insert at the head of the dynamic table.
    ///
    /// An entry larger than the whole table empties it and is not stored.
    pub fn insert(&mut self, name: String, value: String) {
        let size = entry_size(&name, &value);
        if size > self.max_size {
            self.entries.clear();
            self.size = 0;
            return;
        }
        self.evict_to(self.max_size - size);
        self.size += size;
        self.entries.push_front((name, value));
    }

    fn evict_to(&mut self, target: usize) {
        while self.size > target {
            match self.entries.pop_back() {
                Some((name, value)) => self.size -= entry_size(&name, &value),
                None => break,
            }
        }
    }
}
