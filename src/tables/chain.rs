//! `candidate` / `confirmed` tables: nomap, fixed, indexed by height
//! (position), contiguous from 0 to the chain tip (SPEC_FULL.md §4,
//! spec.md §3.3/§4.6 chain management).

use std::path::Path;

use crate::error::{Error, ErrorKind, Result};
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{NomapTable, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEntry {
    pub header_link: Link,
}

impl Record for ChainEntry {
    const SIZE: Option<usize> = Some(8);

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.header_link.value().to_le_bytes());
    }

    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.len() < 8 {
            return None;
        }
        let header_link = Link::new(u64::from_le_bytes(bytes[0..8].try_into().ok()?));
        Some((ChainEntry { header_link }, 8))
    }
}

/// A height-indexed chain (candidate or confirmed). Height `n` is the
/// `n`th record appended; there is no gap-tolerant insertion — pushing
/// past the current tip is the only way to extend the chain, mirroring
/// `nomap`'s append-only body.
pub struct ChainTable(NomapTable<ChainEntry>);

impl ChainTable {
    pub fn create(dir: &Path, name: &'static str, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(ChainTable(NomapTable::create(dir, name, link_size, policy)?))
    }

    pub fn open(dir: &Path, name: &'static str, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(ChainTable(NomapTable::open(dir, name, link_size, policy)?))
    }

    /// Current chain length; the tip height is `height() - 1`.
    pub fn height(&self) -> u64 {
        self.0.count()
    }

    pub fn at(&self, height: u64) -> Result<Link> {
        if height >= self.height() {
            return Err(Error::new(ErrorKind::InvalidLink));
        }
        Ok(self.0.get(Link::new(height))?.header_link)
    }

    /// Append `header_link` as the new tip, returning its height.
    pub fn push(&self, header_link: Link) -> Result<u64> {
        let link = self.0.put(&ChainEntry { header_link })?;
        Ok(link.value())
    }

    /// Drop the current tip, returning the header link that was there.
    pub fn pop(&self) -> Result<Link> {
        let height = self.height();
        if height == 0 {
            return Err(Error::new(ErrorKind::NotFound));
        }
        let top = self.at(height - 1)?;
        self.0.truncate(height - 1)?;
        Ok(top)
    }

    pub fn top(&self) -> Option<Link> {
        let height = self.height();
        if height == 0 {
            None
        } else {
            self.at(height - 1).ok()
        }
    }

    /// The header link at each height in `heights`, in the order given;
    /// heights absent from the chain are silently skipped (SPEC_FULL.md
    /// §4.6 "locator" semantics — duplicates in, duplicates out).
    pub fn hashes_for(&self, heights: &[u64]) -> Vec<Link> {
        heights.iter().filter_map(|&h| self.at(h).ok()).collect()
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_and_top_track_the_tip() {
        let dir = tempfile::tempdir().unwrap();
        let chain = ChainTable::create(dir.path(), "candidate", LinkSize::Bytes4, GrowthPolicy::default())
            .unwrap();
        assert_eq!(chain.top(), None);
        assert_eq!(chain.push(Link::new(10)).unwrap(), 0);
        assert_eq!(chain.push(Link::new(11)).unwrap(), 1);
        assert_eq!(chain.top(), Some(Link::new(11)));
        assert_eq!(chain.pop().unwrap(), Link::new(11));
        assert_eq!(chain.top(), Some(Link::new(10)));
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn pop_on_empty_chain_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let chain = ChainTable::create(dir.path(), "confirmed", LinkSize::Bytes4, GrowthPolicy::default())
            .unwrap();
        assert!(matches!(chain.pop(), Err(e) if e.kind() == ErrorKind::NotFound));
    }
}
