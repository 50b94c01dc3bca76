//! `tx` table: hashmap, fixed payload, keyed by 32-byte tx hash. Multiple
//! records may share a hash across forks (SPEC_FULL.md §4, spec.md §4.4/§8).

use std::path::Path;

use crate::error::Result;
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{HashKey, HashmapTable, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tx {
    pub point_fk: Link,
    pub points_count: u32,
    pub outs_fk: Link,
}

impl Record for Tx {
    const SIZE: Option<usize> = Some(8 + 4 + 8);

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.point_fk.value().to_le_bytes());
        buf.extend_from_slice(&self.points_count.to_le_bytes());
        buf.extend_from_slice(&self.outs_fk.value().to_le_bytes());
    }

    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
        let size = Self::SIZE.unwrap();
        if bytes.len() < size {
            return None;
        }
        let point_fk = Link::new(u64::from_le_bytes(bytes[0..8].try_into().ok()?));
        let points_count = u32::from_le_bytes(bytes[8..12].try_into().ok()?);
        let outs_fk = Link::new(u64::from_le_bytes(bytes[12..20].try_into().ok()?));
        Some((
            Tx {
                point_fk,
                points_count,
                outs_fk,
            },
            size,
        ))
    }
}

pub struct TxTable(HashmapTable<Tx, HashKey>);

impl TxTable {
    pub fn create(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(TxTable(HashmapTable::create(dir, "tx", buckets, link_size, policy)?))
    }

    pub fn open(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(TxTable(HashmapTable::open(dir, "tx", buckets, link_size, policy)?))
    }

    pub fn put(&self, hash: [u8; 32], tx: &Tx) -> Result<Link> {
        self.0.put(HashKey(hash), tx)
    }

    pub fn get(&self, link: Link) -> Result<Tx> {
        self.0.get(link)
    }

    pub fn first(&self, hash: [u8; 32]) -> Link {
        self.0.first(HashKey(hash))
    }

    pub fn find(&self, hash: [u8; 32]) -> Option<Tx> {
        self.0.find(HashKey(hash))
    }

    /// The stored key (tx hash) alongside the payload at `link` — needed
    /// to resolve an owning tx's hash from a link alone (e.g. `to_spenders`
    /// walking an output back up to the prevout identity).
    pub fn get_with_key(&self, link: Link) -> Result<(HashKey, Tx)> {
        self.0.get_with_key(link)
    }

    /// Head-of-bucket link for diagnostic/coverage walks.
    pub fn top(&self, bucket: u64) -> Link {
        self.0.top(bucket)
    }

    /// All records sharing `hash`, most recently inserted first — the
    /// fork-duplicate case (SPEC_FULL.md §4 "multiple tx records may
    /// share a hash across forks").
    pub fn all(&self, hash: [u8; 32]) -> Vec<Link> {
        self.0.it(HashKey(hash)).collect()
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
