//! `outs` table: nomap, slab. A varint-length-prefixed list of output
//! `Link`s for one tx, pointed to by `tx.outs_fk` (SPEC_FULL.md §4).

use std::path::Path;

use crate::error::Result;
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{NomapTable, Record};
use crate::varint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outs(pub Vec<Link>);

impl Record for Outs {
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
        Some((Outs(links), consumed))
    }
}

pub struct OutsTable(NomapTable<Outs>);

impl OutsTable {
    pub fn create(dir: &Path, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(OutsTable(NomapTable::create(dir, "outs", link_size, policy)?))
    }

    pub fn open(dir: &Path, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(OutsTable(NomapTable::open(dir, "outs", link_size, policy)?))
    }

    pub fn put(&self, outs: &Outs) -> Result<Link> {
        self.0.put(outs)
    }

    pub fn get(&self, link: Link) -> Result<Outs> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_nonempty_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let table = OutsTable::create(dir.path(), LinkSize::Bytes4, GrowthPolicy::default()).unwrap();
        let empty = table.put(&Outs(vec![])).unwrap();
        let some = table.put(&Outs(vec![Link::new(0), Link::new(1), Link::new(2)])).unwrap();
        assert_eq!(table.get(empty).unwrap(), Outs(vec![]));
        assert_eq!(
            table.get(some).unwrap(),
            Outs(vec![Link::new(0), Link::new(1), Link::new(2)])
        );
    }
}
