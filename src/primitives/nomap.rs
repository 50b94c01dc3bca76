//! `nomap<Link, Size>`: an unordered table with no in-file index
//! (spec.md §4.3). Fixed-size and slab instantiations share this one type,
//! distinguished at construction by `R::SIZE`.

use std::marker::PhantomData;
use std::path::Path;

use crate::error::{Error, ErrorKind, Result};
use crate::file::{GrowthPolicy, Storage};
use crate::link::{Link, LinkSize};
use crate::primitives::head::HeadFile;
use crate::primitives::record::Record;

pub struct NomapTable<R: Record> {
    head: HeadFile,
    body: Storage,
    link_size: LinkSize,
    _marker: PhantomData<R>,
}

impl<R: Record> NomapTable<R> {
    fn paths(dir: &Path, name: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        (
            dir.join(format!("{name}.head")),
            dir.join(format!("{name}.body")),
        )
    }

    pub fn create(dir: &Path, name: &str, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        let (head_path, body_path) = Self::paths(dir, name);
        let head = HeadFile::create(&head_path, 0, link_size)?;
        let body = Storage::create(&body_path, policy)?;
        Ok(NomapTable {
            head,
            body,
            link_size,
            _marker: PhantomData,
        })
    }

    pub fn open(dir: &Path, name: &str, link_size: LinkSize, policy: GrowthPolicy) -> Result<Self> {
        let (head_path, body_path) = Self::paths(dir, name);
        let head = HeadFile::open(&head_path, 0, link_size)?;
        let body = Storage::open(&body_path, policy)?;
        // Storage::open always starts logical_size at 0; seed it from the
        // head's recorded size (clamped to what's actually on disk) so
        // verify()/restore() have a baseline before an explicit restore.
        let recorded = head.body_logical_size();
        body.set_logical_size(recorded.min(Self::on_disk_len(&body)));
        Ok(NomapTable {
            head,
            body,
            link_size,
            _marker: PhantomData,
        })
    }

    fn on_disk_len(body: &Storage) -> u64 {
        std::fs::metadata(body.path()).map(|m| m.len()).unwrap_or(0)
    }

    fn record_size(&self) -> Option<usize> {
        R::SIZE
    }

    /// Append `element`, returning its link.
    pub fn put(&self, element: &R) -> Result<Link> {
        let mut buf = Vec::new();
        element.encode(&mut buf);

        match self.record_size() {
            Some(size) => {
                debug_assert_eq!(buf.len(), size, "fixed record encoded to wrong length");
                let index = self.body.allocate_fixed(1, size)?;
                let offset = index * size as u64;
                let pin = self.body.get(offset, size)?;
                // Single writer: safe to mutate a range no reader's Pin
                // overlaps with a concurrent insert (spec.md §9).
                unsafe { pin.as_mut_slice().copy_from_slice(&buf) };
                Ok(Link::new(index))
            }
            None => {
                let offset = self.body.allocate_slab(buf.len() as u64)?;
                let pin = self.body.get(offset, buf.len())?;
                unsafe { pin.as_mut_slice().copy_from_slice(&buf) };
                Ok(Link::new(offset))
            }
        }
    }

    /// Caller-provided-output variant named to match spec.md's
    /// `put_link(out_link, element)`; idiomatic Rust returns the link
    /// rather than writing through an out-parameter.
    pub fn put_link(&self, element: &R) -> Result<Link> {
        self.put(element)
    }

    pub fn get(&self, link: Link) -> Result<R> {
        if link.is_terminal(self.link_size) {
            return Err(Error::new(ErrorKind::InvalidLink));
        }

        match self.record_size() {
            Some(size) => {
                let offset = link.value() * size as u64;
                let pin = self.body.get(offset, size)?;
                R::decode_prefix(&pin)
                    .map(|(r, _)| r)
                    .ok_or_else(|| Error::new(ErrorKind::IntegrityFailure))
            }
            None => {
                let offset = link.value();
                let remaining = self.body.size().saturating_sub(offset);
                if remaining == 0 {
                    return Err(Error::new(ErrorKind::InvalidLink));
                }
                let pin = self.body.get(offset, remaining as usize)?;
                R::decode_prefix(&pin)
                    .map(|(r, _)| r)
                    .ok_or_else(|| Error::new(ErrorKind::IntegrityFailure))
            }
        }
    }

    pub fn truncate(&self, count: u64) -> Result<()> {
        let new_size = match self.record_size() {
            Some(size) => count * size as u64,
            None => count, // slab tables truncate by byte offset, not record count
        };
        self.body.truncate(new_size)
    }

    pub fn count(&self) -> u64 {
        match self.record_size() {
            Some(size) => self.body.count(size),
            None => self.body.size(),
        }
    }

    pub fn size(&self) -> u64 {
        self.body.size()
    }

    pub fn head_size(&self) -> u64 {
        crate::primitives::head::head_file_len(0, self.link_size)
    }

    pub fn get_fault(&self) -> crate::error::ErrorKind {
        self.body.get_fault()
    }

    /// Flush body, record `body_logical_size` into head, flush head.
    pub fn backup(&self) -> Result<()> {
        self.body.flush()?;
        self.head.set_body_logical_size(self.body.size());
        self.head.flush()
    }

    /// Truncate the body back to the head's recorded size (crash recovery).
    pub fn restore(&self) -> Result<()> {
        let recorded = self.head.body_logical_size();
        self.body.truncate(recorded)
    }

    pub fn close(&self) -> Result<()> {
        self.backup()
    }

    /// True iff the head's recorded size equals the body's actual size.
    pub fn verify(&self) -> bool {
        self.head.body_logical_size() == self.body.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::record::Record;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Fixed(u32);

    impl Record for Fixed {
        const SIZE: Option<usize> = Some(4);

        fn encode(&self, buf: &mut Vec<u8>) {
            buf.extend_from_slice(&self.0.to_le_bytes());
        }

        fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
            if bytes.len() < 4 {
                return None;
            }
            Some((Fixed(u32::from_le_bytes(bytes[..4].try_into().ok()?)), 4))
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Slab(Vec<u8>);

    impl Record for Slab {
        const SIZE: Option<usize> = None;

        fn encode(&self, buf: &mut Vec<u8>) {
            crate::varint::write_bytes(&self.0, buf);
        }

        fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
            let (body, consumed) = crate::varint::read_bytes(bytes)?;
            Some((Slab(body.to_vec()), consumed))
        }
    }

    #[test]
    fn fixed_put_then_get_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let table: NomapTable<Fixed> =
            NomapTable::create(dir.path(), "fixed", LinkSize::Bytes4, GrowthPolicy::default())
                .unwrap();
        let link0 = table.put(&Fixed(10)).unwrap();
        let link1 = table.put(&Fixed(20)).unwrap();
        assert_eq!(link0, Link::new(0));
        assert_eq!(link1, Link::new(1));
        assert_eq!(table.get(link0).unwrap(), Fixed(10));
        assert_eq!(table.get(link1).unwrap(), Fixed(20));
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn slab_put_then_get_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let table: NomapTable<Slab> =
            NomapTable::create(dir.path(), "slab", LinkSize::Bytes4, GrowthPolicy::default())
                .unwrap();
        let link0 = table.put(&Slab(vec![])).unwrap();
        let link1 = table.put(&Slab(vec![1, 2, 3, 4, 5])).unwrap();
        assert_eq!(link0.value(), 0);
        assert_eq!(link1.value(), 1); // len=0 payload -> 1 byte (varint 0 length)
        assert_eq!(table.get(link0).unwrap(), Slab(vec![]));
        assert_eq!(table.get(link1).unwrap(), Slab(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn backup_then_restore_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let table: NomapTable<Fixed> =
            NomapTable::create(dir.path(), "t", LinkSize::Bytes4, GrowthPolicy::default()).unwrap();
        table.put(&Fixed(1)).unwrap();
        table.put(&Fixed(2)).unwrap();
        table.backup().unwrap();
        assert!(table.verify());
        table.restore().unwrap();
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn crash_truncation_drops_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let table: NomapTable<Fixed> =
            NomapTable::create(dir.path(), "t", LinkSize::Bytes4, GrowthPolicy::default()).unwrap();
        table.put(&Fixed(1)).unwrap();
        table.backup().unwrap(); // recorded size = 4
        table.put(&Fixed(2)).unwrap(); // logical size now 8, never backed up
        table.restore().unwrap();
        assert_eq!(table.count(), 1);
        assert!(table.verify());
    }
}
