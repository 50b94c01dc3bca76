//! `point` table: hashmap, fixed payload, keyed by the composite
//! `(hash, index)` naming the prevout being spent. Records for one
//! spending tx are allocated contiguously in input order, enabling
//! `to_points`' range read (SPEC_FULL.md §4, spec.md §3.3).

use std::path::Path;

use crate::error::Result;
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{HashmapTable, PointKey, Record, NULL_INDEX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub parent_fk: Link,
}

impl Record for Point {
    const SIZE: Option<usize> = Some(8);

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.parent_fk.value().to_le_bytes());
    }

    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.len() < 8 {
            return None;
        }
        let parent_fk = Link::new(u64::from_le_bytes(bytes[0..8].try_into().ok()?));
        Some((Point { parent_fk }, 8))
    }
}

pub struct PointTable(HashmapTable<Point, PointKey>);

impl PointTable {
    pub fn create(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(PointTable(HashmapTable::create(
            dir, "point", buckets, link_size, policy,
        )?))
    }

    pub fn open(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(PointTable(HashmapTable::open(
            dir, "point", buckets, link_size, policy,
        )?))
    }

    /// Allocate `count` contiguous point records for one tx's inputs,
    /// returning the link of the first. A coinbase tx (no real prevouts)
    /// still allocates one record with `index == NULL_INDEX`.
    pub fn put_inputs(&self, prevouts: &[(([u8; 32], u32), Link)]) -> Result<Link> {
        let mut first = None;
        for ((hash, index), parent_fk) in prevouts {
            let key = PointKey {
                hash: *hash,
                index: *index,
            };
            let link = self.0.put(key, &Point { parent_fk: *parent_fk })?;
            if first.is_none() {
                first = Some(link);
            }
        }
        first.ok_or_else(|| crate::error::Error::new(crate::error::ErrorKind::InvalidLink))
    }

    pub fn get(&self, link: Link) -> Result<Point> {
        self.0.get(link)
    }

    pub fn find(&self, hash: [u8; 32], index: u32) -> Option<Point> {
        self.0.find(PointKey { hash, index })
    }

    pub fn find_coinbase(&self, hash: [u8; 32]) -> Option<Point> {
        self.find(hash, NULL_INDEX)
    }

    /// The key (prevout identity) alongside the payload at `link` —
    /// `to_prevouts` needs the key since the payload alone (the spending
    /// tx) doesn't name which output is being spent.
    pub fn get_with_key(&self, link: Link) -> Result<(PointKey, Point)> {
        self.0.get_with_key(link)
    }

    /// Head-of-bucket link for diagnostic/coverage walks.
    pub fn top(&self, bucket: u64) -> Link {
        self.0.top(bucket)
    }

    /// Every point link recorded against prevout `(hash, index)`, most
    /// recent first — ordinarily one entry, more than one only across
    /// forks that both spend the same prevout.
    pub fn spenders(&self, hash: [u8; 32], index: u32) -> Vec<Link> {
        self.0.it(PointKey { hash, index }).collect()
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
