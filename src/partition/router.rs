use serde::{Deserialize, Serialize};
use std::fmt;
use crate::constants::{
    BUCKET_ID_LIMIT, ROUTING_OTHER_SYMBOL, ROUTING_RADIX, SENTINEL_BUCKET_ID,
};

/// Identifier of a prefix bucket, always below [`BUCKET_ID_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketId(u16);

impl BucketId {
    pub const SENTINEL: BucketId = BucketId(SENTINEL_BUCKET_ID);

    pub fn new(raw: u16) -> Option<Self> {
        (raw < BUCKET_ID_LIMIT).then_some(BucketId(raw))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims surrounding whitespace and lowercases.
pub fn normalize(line: &str) -> String {
    line.trim().to_lowercase()
}

fn symbol(c: char) -> u16 {
    match c {
        '0'..='9' => c as u16 - '0' as u16,
        'a'..='z' => c as u16 - 'a' as u16 + 10,
        _ => ROUTING_OTHER_SYMBOL,
    }
}

/// Maps a normalized line to its bucket using its first two characters.
///
/// Equal lines share a prefix and therefore a bucket, which is what lets the
/// merger deduplicate bucket by bucket and still produce globally unique
/// output. Any routing change must keep that property.
///
/// Lines shorter than two characters land in the sentinel bucket. Every
/// character outside `[0-9a-z]` shares one symbol, so prefixes such as `"@@"`
/// and `"##"` collide.
pub fn route(line: &str) -> BucketId {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) => {
            BucketId(symbol(first) * ROUTING_RADIX * ROUTING_RADIX + symbol(second))
        }
        _ => BucketId::SENTINEL,
    }
}
