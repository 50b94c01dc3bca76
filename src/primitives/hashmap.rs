//! `hashmap<Link, Key, Size>`: a bucketed chained hashmap (spec.md §4.4).
//!
//! On-disk record shape: `next: Link, key: Key, payload`. Insertion is
//! prepended (LIFO) to the bucket chain under a per-bucket mutex — the
//! sharded-mutex-per-bucket design mirrors the teacher's single
//! process-wide rwlock, generalized to fine-grained shards since this
//! store supports many independent writers-by-table rather than one
//! global cache lock.

use std::marker::PhantomData;
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{Error, ErrorKind, Result};
use crate::file::{GrowthPolicy, Storage};
use crate::link::{Link, LinkSize};
use crate::primitives::head::HeadFile;
use crate::primitives::record::{Key, Record};

/// Number of independent mutex shards guarding bucket-head updates.
/// Buckets hash onto shards by `bucket % SHARDS`, bounding lock
/// footprint regardless of table size.
const SHARDS: usize = 256;

pub struct HashmapTable<R: Record, K: Key> {
    head: HeadFile,
    body: Storage,
    link_size: LinkSize,
    buckets: u64,
    shards: Vec<Mutex<()>>,
    _marker: PhantomData<(R, K)>,
}

impl<R: Record, K: Key> HashmapTable<R, K> {
    fn paths(dir: &Path, name: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        (
            dir.join(format!("{name}.head")),
            dir.join(format!("{name}.body")),
        )
    }

    pub fn create(
        dir: &Path,
        name: &str,
        buckets: u64,
        link_size: LinkSize,
        policy: GrowthPolicy,
    ) -> Result<Self> {
        let (head_path, body_path) = Self::paths(dir, name);
        let head = HeadFile::create(&head_path, buckets, link_size)?;
        let body = Storage::create(&body_path, policy)?;
        Ok(Self::new(head, body, buckets, link_size))
    }

    pub fn open(
        dir: &Path,
        name: &str,
        buckets: u64,
        link_size: LinkSize,
        policy: GrowthPolicy,
    ) -> Result<Self> {
        let (head_path, body_path) = Self::paths(dir, name);
        let head = HeadFile::open(&head_path, buckets, link_size)?;
        let body = Storage::open(&body_path, policy)?;
        let recorded = head.body_logical_size();
        let on_disk = std::fs::metadata(body.path()).map(|m| m.len()).unwrap_or(0);
        body.set_logical_size(recorded.min(on_disk));
        Ok(Self::new(head, body, buckets, link_size))
    }

    fn new(head: HeadFile, body: Storage, buckets: u64, link_size: LinkSize) -> Self {
        let shards = (0..SHARDS.min(buckets.max(1) as usize))
            .map(|_| Mutex::new(()))
            .collect();
        HashmapTable {
            head,
            body,
            link_size,
            buckets,
            shards,
            _marker: PhantomData,
        }
    }

    fn envelope_fixed_size(&self) -> Option<usize> {
        R::SIZE.map(|payload| self.link_size.width() + K::SIZE + payload)
    }

    fn shard_for(&self, bucket: u64) -> &Mutex<()> {
        &self.shards[bucket as usize % self.shards.len()]
    }

    /// Insert `element` under `key`, LIFO-prepending it to its bucket chain.
    pub fn put(&self, key: K, element: &R) -> Result<Link> {
        let mut buf = vec![0u8; self.link_size.width()]; // next, patched below
        let mut key_buf = vec![0u8; K::SIZE];
        key.write(&mut key_buf);
        buf.extend_from_slice(&key_buf);
        element.encode(&mut buf);

        let bucket = key.bucket(self.buckets);
        let _shard = self.shard_for(bucket).lock();

        let current_head = self.head.bucket_head(bucket);
        self.link_size.write(current_head, &mut buf[..self.link_size.width()]);

        let link = match self.envelope_fixed_size() {
            Some(size) => {
                debug_assert_eq!(buf.len(), size);
                let index = self.body.allocate_fixed(1, size)?;
                let offset = index * size as u64;
                let pin = self.body.get(offset, size)?;
                unsafe { pin.as_mut_slice().copy_from_slice(&buf) };
                Link::new(index)
            }
            None => {
                let offset = self.body.allocate_slab(buf.len() as u64)?;
                let pin = self.body.get(offset, buf.len())?;
                unsafe { pin.as_mut_slice().copy_from_slice(&buf) };
                Link::new(offset)
            }
        };

        self.head.set_bucket_head(bucket, link);
        Ok(link)
    }

    /// Read the envelope at `link`: `(next, key_bytes, payload)`.
    fn read_at(&self, link: Link) -> Result<(Link, Vec<u8>, R)> {
        let width = self.link_size.width();
        match self.envelope_fixed_size() {
            Some(size) => {
                let offset = link.value() * size as u64;
                let pin = self.body.get(offset, size)?;
                let next = self.link_size.read(&pin[..width]);
                let key_bytes = pin[width..width + K::SIZE].to_vec();
                let (payload, _) = R::decode_prefix(&pin[width + K::SIZE..])
                    .ok_or_else(|| Error::new(ErrorKind::IntegrityFailure))?;
                Ok((next, key_bytes, payload))
            }
            None => {
                let offset = link.value();
                let remaining = self.body.size().saturating_sub(offset);
                if remaining < (width + K::SIZE) as u64 {
                    return Err(Error::new(ErrorKind::InvalidLink));
                }
                let pin = self.body.get(offset, remaining as usize)?;
                let next = self.link_size.read(&pin[..width]);
                let key_bytes = pin[width..width + K::SIZE].to_vec();
                let (payload, _) = R::decode_prefix(&pin[width + K::SIZE..])
                    .ok_or_else(|| Error::new(ErrorKind::IntegrityFailure))?;
                Ok((next, key_bytes, payload))
            }
        }
    }

    /// Current head link of `bucket` (diagnostic/coverage walks, spec.md §4.5).
    pub fn top(&self, bucket: u64) -> Link {
        self.head.bucket_head(bucket)
    }

    /// Head of the chain for `bucket(key)` whose stored key equals `key` —
    /// the most recently inserted matching entry, since insertion is LIFO.
    pub fn first(&self, key: K) -> Link {
        self.iter_matching(key).next().unwrap_or(Link::terminal(self.link_size))
    }

    pub fn find(&self, key: K) -> Option<R> {
        let link = self.first(key);
        if link.is_terminal(self.link_size) {
            return None;
        }
        self.get(link).ok()
    }

    pub fn get(&self, link: Link) -> Result<R> {
        if link.is_terminal(self.link_size) {
            return Err(Error::new(ErrorKind::InvalidLink));
        }
        self.read_at(link).map(|(_, _, payload)| payload)
    }

    /// Like [`Self::get`], but also decodes the stored key — needed where
    /// the key carries information the payload doesn't (e.g. `point`'s
    /// prevout identity is the key, not the payload).
    pub fn get_with_key(&self, link: Link) -> Result<(K, R)> {
        if link.is_terminal(self.link_size) {
            return Err(Error::new(ErrorKind::InvalidLink));
        }
        let (_, key_bytes, payload) = self.read_at(link)?;
        Ok((K::read(&key_bytes), payload))
    }

    /// A lazy, restartable iterator over the bucket(key) chain, yielding
    /// links (most-recent-first) whose stored key equals `key` — including
    /// skipping past unrelated entries that hash-collided into the same
    /// bucket.
    pub fn it(&self, key: K) -> HashmapIterator<'_, R, K> {
        HashmapIterator {
            table: self,
            key,
            cursor: None,
            steps: 0,
        }
    }

    fn iter_matching(&self, key: K) -> HashmapIterator<'_, R, K> {
        self.it(key)
    }

    pub fn count(&self) -> u64 {
        match self.envelope_fixed_size() {
            Some(size) => self.body.count(size),
            None => self.body.size(),
        }
    }

    pub fn size(&self) -> u64 {
        self.body.size()
    }

    pub fn head_size(&self) -> u64 {
        crate::primitives::head::head_file_len(self.buckets, self.link_size)
    }

    pub fn get_fault(&self) -> crate::error::ErrorKind {
        self.body.get_fault()
    }

    pub fn backup(&self) -> Result<()> {
        self.body.flush()?;
        self.head.set_body_logical_size(self.body.size());
        self.head.flush()
    }

    pub fn restore(&self) -> Result<()> {
        let recorded = self.head.body_logical_size();
        self.body.truncate(recorded)
    }

    pub fn close(&self) -> Result<()> {
        self.backup()
    }

    pub fn verify(&self) -> bool {
        self.head.body_logical_size() == self.body.size()
    }
}

/// Iterator over a hashmap bucket chain, filtered to one key.
///
/// Lazy: the first `next()` call is what actually touches the bucket head;
/// "restartable" in the sense that a fresh `it(key)` call always starts
/// over from the current bucket head, observing any insertions made since
/// a prior iterator was created.
pub struct HashmapIterator<'a, R: Record, K: Key> {
    table: &'a HashmapTable<R, K>,
    key: K,
    cursor: Option<Link>,
    steps: u64,
}

impl<'a, R: Record, K: Key> Iterator for HashmapIterator<'a, R, K> {
    type Item = Link;

    fn next(&mut self) -> Option<Link> {
        let mut cursor = match self.cursor {
            Some(link) => link,
            None => self.table.head.bucket_head(self.key.bucket(self.table.buckets)),
        };

        // Bound the walk so a corrupted chain can't hang the reader
        // (spec.md §8: the chain terminates within <= count() steps).
        let bound = self.table.count().saturating_add(1);

        loop {
            if cursor.is_terminal(self.table.link_size) {
                self.cursor = Some(cursor);
                return None;
            }
            if self.steps > bound {
                log::error!("hashmap bucket chain exceeded expected bound; treating as corrupt");
                self.cursor = Some(Link::terminal(self.table.link_size));
                return None;
            }
            self.steps += 1;

            let (next, key_bytes, _payload) = match self.table.read_at(cursor) {
                Ok(v) => v,
                Err(_) => {
                    self.cursor = Some(Link::terminal(self.table.link_size));
                    return None;
                }
            };

            if self.key.matches(&key_bytes) {
                self.cursor = Some(next);
                return Some(cursor);
            }
            cursor = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::record::HashKey;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Payload(u32);

    impl Record for Payload {
        const SIZE: Option<usize> = Some(4);

        fn encode(&self, buf: &mut Vec<u8>) {
            buf.extend_from_slice(&self.0.to_le_bytes());
        }

        fn decode_prefix(bytes: &[u8]) -> Option<(Self, usize)> {
            Some((Payload(u32::from_le_bytes(bytes[..4].try_into().ok()?)), 4))
        }
    }

    fn hash(byte: u8) -> HashKey {
        let mut h = [0u8; 32];
        h[0] = byte;
        HashKey(h)
    }

    #[test]
    fn put_then_first_returns_link() {
        let dir = tempfile::tempdir().unwrap();
        let table: HashmapTable<Payload, HashKey> =
            HashmapTable::create(dir.path(), "t", 16, LinkSize::Bytes4, GrowthPolicy::default())
                .unwrap();
        let link = table.put(hash(1), &Payload(42)).unwrap();
        assert_eq!(table.first(hash(1)), link);
        assert_eq!(table.find(hash(1)), Some(Payload(42)));
        assert_eq!(table.find(hash(2)), None);
    }

    #[test]
    fn duplicate_keys_iterate_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let table: HashmapTable<Payload, HashKey> =
            HashmapTable::create(dir.path(), "t", 4, LinkSize::Bytes4, GrowthPolicy::default())
                .unwrap();
        let first = table.put(hash(7), &Payload(1)).unwrap();
        let second = table.put(hash(7), &Payload(2)).unwrap();
        assert_eq!(table.first(hash(7)), second);
        let links: Vec<_> = table.it(hash(7)).collect();
        assert_eq!(links, vec![second, first]);
    }

    #[test]
    fn iterator_is_restartable_across_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let table: HashmapTable<Payload, HashKey> =
            HashmapTable::create(dir.path(), "t", 4, LinkSize::Bytes4, GrowthPolicy::default())
                .unwrap();
        table.put(hash(3), &Payload(1)).unwrap();
        let mut it = table.it(hash(3));
        assert!(it.next().is_some());
        assert_eq!(it.next(), None);
        // fresh iterator after an insert picks up the new head
        table.put(hash(3), &Payload(2)).unwrap();
        let again: Vec<_> = table.it(hash(3)).collect();
        assert_eq!(again.len(), 2);
    }
}
