//! The `Record` and `Key` traits parameterizing the two table primitives
//! over fixed-size or slab payloads, and over fixed-width keys
//! (spec.md §3.1, §9 "two concrete types preferred over template
//! specialization").

/// A payload stored in a nomap or hashmap table.
///
/// `SIZE` distinguishes the fixed instantiation (`Some(n)`: every record is
/// exactly `n` bytes, over-read is impossible by construction) from the
/// slab instantiation (`None`: records are self-delimiting, typically via
/// [`crate::varint`]-prefixed fields).
pub trait Record: Sized {
    const SIZE: Option<usize>;

    fn encode(&self, buf: &mut Vec<u8>);

    /// Decode one record from the front of `bytes`, returning the value and
    /// the number of bytes consumed. For fixed records this must consume
    /// exactly `SIZE.unwrap()` bytes; `bytes` may be longer than one record
    /// for slab tables (trailing bytes belong to later records).
    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)>;
}

/// A fixed-width lookup key for a hashmap table.
pub trait Key: Copy {
    const SIZE: usize;

    fn write(&self, buf: &mut [u8]);

    fn read(bytes: &[u8]) -> Self;

    /// `bucket(key) = hash(key) mod buckets` (spec.md §3.1).
    fn bucket(&self, buckets: u64) -> u64;

    fn matches(&self, bytes: &[u8]) -> bool {
        let mut buf = vec![0u8; Self::SIZE];
        self.write(&mut buf);
        buf == bytes[..Self::SIZE]
    }
}

/// A plain 32-byte digest key (block hash, tx hash), as used by the
/// `header` and `tx` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey(pub [u8; 32]);

impl Key for HashKey {
    const SIZE: usize = 32;

    fn write(&self, buf: &mut [u8]) {
        buf[..32].copy_from_slice(&self.0);
    }

    fn read(bytes: &[u8]) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes[..32]);
        HashKey(out)
    }

    /// "for 32-byte hashes, the first 4/8 bytes taken little-endian
    /// suffice" (spec.md §3.1) — digests are already uniformly
    /// distributed, so truncation is a sound bucket function.
    fn bucket(&self, buckets: u64) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(head) % buckets
    }
}

/// A composite `(hash, index)` key, used by the `point` table to name the
/// prevout being spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointKey {
    pub hash: [u8; 32],
    pub index: u32,
}

/// Coinbase inputs reference no prevout; `index` carries this sentinel
/// (spec.md §4.5 "Coinbase outputs (index = null_index ...)").
pub const NULL_INDEX: u32 = u32::MAX;

impl Key for PointKey {
    const SIZE: usize = 36;

    fn write(&self, buf: &mut [u8]) {
        buf[..32].copy_from_slice(&self.hash);
        buf[32..36].copy_from_slice(&self.index.to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[..32]);
        let index = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
        PointKey { hash, index }
    }

    /// Unlike a plain digest, both fields carry information worth mixing
    /// (the index is low-entropy on its own), so this key goes through a
    /// real hash rather than pure truncation — `ahash` is already part of
    /// the teacher's dependency stack.
    fn bucket(&self, buckets: u64) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = ahash::AHasher::default();
        self.hash.hash(&mut hasher);
        self.index.hash(&mut hasher);
        hasher.finish() % buckets
    }
}

/// A `Link`-valued key, used by the `txs` (keyed by header link) and
/// `strong_tx` (keyed by tx link) hashmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkKey(pub crate::link::Link);

impl Key for LinkKey {
    const SIZE: usize = 8;

    fn write(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.0.value().to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        let value = u64::from_le_bytes(bytes[..8].try_into().unwrap());
        LinkKey(crate::link::Link::new(value))
    }

    fn bucket(&self, buckets: u64) -> u64 {
        self.0.value() % buckets
    }
}
