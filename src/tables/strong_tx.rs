//! `strong_tx` table: hashmap, fixed, keyed by tx `Link`. Records whether
//! a tx is strong (positively or negatively) with respect to a header
//! (SPEC_FULL.md §4).

use std::path::Path;

use crate::error::Result;
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{HashmapTable, LinkKey, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrongTx {
    pub header_fk: Link,
    pub positive: bool,
}

impl Record for StrongTx {
    const SIZE: Option<usize> = Some(8 + 1);

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.header_fk.value().to_le_bytes());
        buf.push(self.positive as u8);
    }

    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
        let size = Self::SIZE.unwrap();
        if bytes.len() < size {
            return None;
        }
        let header_fk = Link::new(u64::from_le_bytes(bytes[0..8].try_into().ok()?));
        let positive = bytes[8] != 0;
        Some((StrongTx { header_fk, positive }, size))
    }
}

pub struct StrongTxTable(HashmapTable<StrongTx, LinkKey>);

impl StrongTxTable {
    pub fn create(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(StrongTxTable(HashmapTable::create(
            dir, "strong_tx", buckets, link_size, policy,
        )?))
    }

    pub fn open(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(StrongTxTable(HashmapTable::open(
            dir, "strong_tx", buckets, link_size, policy,
        )?))
    }

    pub fn put(&self, tx_link: Link, entry: &StrongTx) -> Result<Link> {
        self.0.put(LinkKey(tx_link), entry)
    }

    pub fn find(&self, tx_link: Link) -> Option<StrongTx> {
        self.0.find(LinkKey(tx_link))
    }

    /// Every strong_tx record naming `tx_link`, most recent first — a tx
    /// may be strong with respect to more than one header across forks.
    pub fn all(&self, tx_link: Link) -> Vec<Link> {
        self.0.it(LinkKey(tx_link)).collect()
    }

    pub fn get(&self, link: Link) -> Result<StrongTx> {
        self.0.get(link)
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
