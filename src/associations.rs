//! In-memory tracking set for candidate headers not yet associated with a
//! `txs` record — three lookup views over the same entries (by hash, by
//! height, by insertion position), grounded in
//! `original_source/include/bitcoin/database/tables/association.hpp`'s
//! `link / hash / context(height)` multi-index record.
//!
//! This is a pending-work set, not a persisted table: candidates are
//! inserted as they're pushed onto the candidate chain and removed once
//! their `txs` record lands (`to_txs` returns `Some`), driving
//! `get_unassociated_above`/`get_top_associated` without a body scan.

use std::collections::{BTreeMap, HashMap};

use crate::link::Link;

/// The validation-state fields carried alongside a candidate header,
/// independent of the header's own stored fields (`timestamp` is read
/// through from the header; `flags`/`median_time_past` are supplied by the
/// caller at push time, same as libbitcoin's `database::context`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub flags: u32,
    pub height: u64,
    pub timestamp: u32,
    pub median_time_past: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub link: Link,
    pub hash: [u8; 32],
    pub context: Context,
}

#[derive(Default)]
pub struct Associations {
    /// Insertion order — the "pos" view.
    items: Vec<Association>,
    by_hash: HashMap<[u8; 32], usize>,
    by_height: BTreeMap<u64, usize>,
}

impl Associations {
    pub fn new() -> Self {
        Associations::default()
    }

    pub fn insert(&mut self, association: Association) {
        let index = self.items.len();
        self.by_hash.insert(association.hash, index);
        self.by_height.insert(association.context.height, index);
        self.items.push(association);
    }

    pub fn by_hash(&self, hash: &[u8; 32]) -> Option<&Association> {
        self.by_hash.get(hash).map(|&i| &self.items[i])
    }

    pub fn by_height(&self, height: u64) -> Option<&Association> {
        self.by_height.get(&height).map(|&i| &self.items[i])
    }

    pub fn by_pos(&self, pos: usize) -> Option<&Association> {
        self.items.get(pos)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove the entry at `height`, if tracked — called once its `txs`
    /// record is written and it is no longer "unassociated".
    pub fn remove_height(&mut self, height: u64) -> Option<Association> {
        let index = self.by_height.remove(&height)?;
        let association = self.items[index];
        self.by_hash.remove(&association.hash);
        // items/by_height indices after `index` stay valid: we leave a
        // hole in `items` rather than shifting, to keep `by_pos` stable.
        Some(association)
    }

    /// Associations still unassociated at heights strictly above `from`,
    /// ordered by height ascending, truncated to `limit` if given.
    pub fn above(&self, from: u64, limit: Option<usize>) -> Vec<Association> {
        let entries = self.by_height.range((from + 1)..).map(|(_, &i)| self.items[i]);
        match limit {
            Some(n) => entries.take(n).collect(),
            None => entries.collect(),
        }
    }

    pub fn count_above(&self, from: u64) -> usize {
        self.by_height.range((from + 1)..).count()
    }

    /// The lowest tracked height, if any — the next block the caller
    /// should fetch/associate.
    pub fn lowest(&self) -> Option<&Association> {
        self.by_height.values().next().map(|&i| &self.items[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> [u8; 32] {
        let mut h = [0u8; 32];
        h[0] = byte;
        h
    }

    fn context(height: u64) -> Context {
        Context {
            flags: 0,
            height,
            timestamp: 0,
            median_time_past: 0,
        }
    }

    #[test]
    fn three_views_agree() {
        let mut set = Associations::new();
        set.insert(Association {
            link: Link::new(0),
            hash: hash(1),
            context: context(10),
        });
        set.insert(Association {
            link: Link::new(1),
            hash: hash(2),
            context: context(11),
        });

        assert_eq!(set.by_hash(&hash(1)).unwrap().context.height, 10);
        assert_eq!(set.by_height(11).unwrap().hash, hash(2));
        assert_eq!(set.by_pos(0).unwrap().context.height, 10);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn heights_above_and_removal() {
        let mut set = Associations::new();
        for (i, height) in [5u64, 6, 9].into_iter().enumerate() {
            set.insert(Association {
                link: Link::new(i as u64),
                hash: hash(i as u8),
                context: context(height),
            });
        }
        let above = |from| set.above(from, None).iter().map(|a| a.context.height).collect::<Vec<_>>();
        assert_eq!(above(5), vec![6, 9]);
        assert_eq!(set.count_above(5), 2);
        assert_eq!(set.above(5, Some(1)).len(), 1);
        let removed = set.remove_height(6).unwrap();
        assert_eq!(removed.context.height, 6);
        assert_eq!(above(5), vec![9]);
        assert!(set.by_hash(&hash(1)).is_none());
    }
}
