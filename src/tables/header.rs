//! `header` table: hashmap, fixed payload, keyed by 32-byte block hash
//! (SPEC_FULL.md §4).

use std::path::Path;

use crate::error::Result;
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{HashKey, HashmapTable, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub previous_fk: Link,
    pub version: u32,
    pub merkle_root: [u8; 32],
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl Record for Header {
    // previous_fk(8) + version(4) + merkle_root(32) + timestamp(4) + bits(4) + nonce(4)
    const SIZE: Option<usize> = Some(8 + 4 + 32 + 4 + 4 + 4);

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.previous_fk.value().to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.merkle_root);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.bits.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
    }

    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
        let size = Self::SIZE.unwrap();
        if bytes.len() < size {
            return None;
        }
        let previous_fk = Link::new(u64::from_le_bytes(bytes[0..8].try_into().ok()?));
        let version = u32::from_le_bytes(bytes[8..12].try_into().ok()?);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&bytes[12..44]);
        let timestamp = u32::from_le_bytes(bytes[44..48].try_into().ok()?);
        let bits = u32::from_le_bytes(bytes[48..52].try_into().ok()?);
        let nonce = u32::from_le_bytes(bytes[52..56].try_into().ok()?);
        Some((
            Header {
                previous_fk,
                version,
                merkle_root,
                timestamp,
                bits,
                nonce,
            },
            size,
        ))
    }
}

pub struct HeaderTable(HashmapTable<Header, HashKey>);

impl HeaderTable {
    pub fn create(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(HeaderTable(HashmapTable::create(
            dir, "header", buckets, link_size, policy,
        )?))
    }

    pub fn open(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(HeaderTable(HashmapTable::open(
            dir, "header", buckets, link_size, policy,
        )?))
    }

    pub fn put(&self, hash: [u8; 32], header: &Header) -> Result<Link> {
        self.0.put(HashKey(hash), header)
    }

    pub fn get(&self, link: Link) -> Result<Header> {
        self.0.get(link)
    }

    /// Most recently inserted record whose key is `hash`, or terminal.
    pub fn first(&self, hash: [u8; 32]) -> Link {
        self.0.first(HashKey(hash))
    }

    pub fn find(&self, hash: [u8; 32]) -> Option<Header> {
        self.0.find(HashKey(hash))
    }

    /// Head-of-bucket link for diagnostic/coverage walks.
    pub fn top(&self, bucket: u64) -> Link {
        self.0.top(bucket)
    }

    pub fn backup(&self) -> Result<()> {
        self.0.backup()
    }

    pub fn restore(&self) -> Result<()> {
        self.0.restore()
    }

    pub fn close(&self) -> Result<()> {
        self.0.close()
    }

    pub fn verify(&self) -> bool {
        self.0.verify()
    }

    pub fn count(&self) -> u64 {
        self.0.count()
    }
}
