//! `neutrino` table: hashmap, slab, keyed by header `Link`. Included for
//! completeness of the translate surface (`to_filter`); filter
//! construction/consensus validity is out of scope (SPEC_FULL.md §4).

use std::path::Path;

use crate::error::Result;
use crate::file::GrowthPolicy;
use crate::link::{Link, LinkSize};
use crate::primitives::{HashmapTable, LinkKey, Record};
use crate::varint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neutrino {
    pub filter_header: [u8; 32],
    pub filter: Vec<u8>,
}

impl Record for Neutrino {
    const SIZE: Option<usize> = None;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.filter_header);
        varint::write_bytes(&self.filter, buf);
    }

    fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.len() < 32 {
            return None;
        }
        let mut filter_header = [0u8; 32];
        filter_header.copy_from_slice(&bytes[..32]);
        let (filter, filter_len) = varint::read_bytes(&bytes[32..])?;
        Some((
            Neutrino {
                filter_header,
                filter: filter.to_vec(),
            },
            32 + filter_len,
        ))
    }
}

pub struct NeutrinoTable(HashmapTable<Neutrino, LinkKey>);

impl NeutrinoTable {
    pub fn create(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(NeutrinoTable(HashmapTable::create(
            dir, "neutrino", buckets, link_size, policy,
        )?))
    }

    pub fn open(dir: &Path, buckets: u64, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        Ok(NeutrinoTable(HashmapTable::open(
            dir, "neutrino", buckets, link_size, policy,
        )?))
    }

    pub fn put(&self, header_link: Link, entry: &Neutrino) -> Result<Link> {
        self.0.put(LinkKey(header_link), entry)
    }

    pub fn find(&self, header_link: Link) -> Option<Neutrino> {
        self.0.find(LinkKey(header_link))
    }

    pub fn get(&self, link: Link) -> Result<Neutrino> {
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
