//! `txs` table: hashmap, slab, keyed by header `Link`. A
//! varint-length-prefixed list of tx `Link`s for that block, coinbase
//! first. Existence of a record for a header is what "associated" means
//! (SPEC_FULL.md §4, spec.md §4.6/Glossary).

use std::path::Path;

use crate::error::Result;
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{HashmapTable, LinkKey, Record};
use crate::varint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Txs(pub Vec<Link>);

impl Record for Txs {
    const SIZE: Option<usize> = None;

    fn encode(&self, buf: &mut Vec<u8>) {
        varint::write(self.0.len() as u64, buf);
        for link in &self.0 {
            buf.extend_from_slice(&link.value().to_le_bytes());
        }
    }

    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
        let (count, mut consumed) = varint::read(bytes)?;
        let mut links = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let chunk = bytes.get(consumed..consumed + 8)?;
            links.push(Link::new(u64::from_le_bytes(chunk.try_into().ok()?)));
            consumed += 8;
        }
        Some((Txs(links), consumed))
    }
}

pub struct TxsTable(HashmapTable<Txs, LinkKey>);

impl TxsTable {
    pub fn create(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(TxsTable(HashmapTable::create(
            dir, "txs", buckets, link_size, policy,
        )?))
    }

    pub fn open(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(TxsTable(HashmapTable::open(
            dir, "txs", buckets, link_size, policy,
        )?))
    }

    pub fn put(&self, header_link: Link, txs: &Txs) -> Result<Link> {
        self.0.put(LinkKey(header_link), txs)
    }

    pub fn get(&self, link: Link) -> Result<Txs> {
        self.0.get(link)
    }

    /// The txs list for `header_link`, or `None` if unassociated.
    pub fn find(&self, header_link: Link) -> Option<Txs> {
        self.0.find(LinkKey(header_link))
    }

    pub fn is_associated(&self, header_link: Link) -> bool {
        self.find(header_link).is_some()
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
