//! Translate layer: stateless graph navigation across tables (spec.md
//! §4.6) plus candidate/confirmed chain management (§4.7) layered on top
//! of an in-memory [`Associations`] tracking set.
//!
//! Every `to_*` method is a pure read that never propagates a detailed
//! [`crate::error::Error`] — a broken link or missing record yields
//! `None`/an empty `Vec`, with the underlying table's sticky fault code
//! (`Store::*.get_fault()`) available out-of-band, per spec.md's
//! navigation error-propagation policy.

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::associations::{Association, Associations, Context};
use crate::link::Link;
use crate::store::Store;
use crate::tables::{Header, Neutrino, Outs, Output, Point, Tx, Txs};

pub struct Query<'a> {
    store: &'a Store,
    associations: Mutex<Associations>,
}

impl<'a> Query<'a> {
    pub fn new(store: &'a Store) -> Self {
        Query {
            store,
            associations: Mutex::new(Associations::new()),
        }
    }

    // -- direct lookups --------------------------------------------------

    pub fn to_header(&self, link: Link) -> Option<Header> {
        self.store.header.get(link).ok()
    }

    pub fn to_tx(&self, link: Link) -> Option<Tx> {
        self.store.tx.get(link).ok()
    }

    pub fn to_txs(&self, header_link: Link) -> Option<Txs> {
        self.store.txs.find(header_link)
    }

    pub fn to_filter(&self, header_link: Link) -> Option<Neutrino> {
        self.store.neutrino.find(header_link)
    }

    pub fn to_candidate(&self, height: u64) -> Option<Link> {
        self.store.candidate.at(height).ok()
    }

    pub fn to_confirmed(&self, height: u64) -> Option<Link> {
        self.store.confirmed.at(height).ok()
    }

    /// `tx_link`'s block, if the tx is strong with respect to one: look up
    /// `strong_tx` by `tx_link`, and if found with `positive == true`,
    /// return its `header_fk`. A tx reorganized out of the strong chain (or
    /// never marked strong) resolves to `None`.
    pub fn to_block(&self, tx_link: Link) -> Option<Link> {
        let entry = self.store.strong_tx.find(tx_link)?;
        entry.positive.then_some(entry.header_fk)
    }

    /// The block of the first `tx_link` sharing `tx_hash` whose `to_block`
    /// resolves — there may be several tx records sharing a hash across
    /// reorged forks, but at most one is strong at a time.
    pub fn to_strong(&self, tx_hash: [u8; 32]) -> Option<Link> {
        self.store
            .tx
            .all(tx_hash)
            .into_iter()
            .find_map(|tx_link| self.to_block(tx_link))
    }

    // -- graph navigation -------------------------------------------------

    /// The input points of `tx_link`'s spending transaction, in input
    /// order (the contiguous range starting at `tx.point_fk`).
    pub fn to_points(&self, tx_link: Link) -> Vec<Point> {
        let Some(tx) = self.to_tx(tx_link) else {
            return Vec::new();
        };
        (0..tx.points_count as u64)
            .filter_map(|i| self.store.point.get(Link::new(tx.point_fk.value() + i)).ok())
            .collect()
    }

    fn to_points_with_keys(&self, tx_link: Link) -> Vec<(crate::primitives::PointKey, Point)> {
        let Some(tx) = self.to_tx(tx_link) else {
            return Vec::new();
        };
        (0..tx.points_count as u64)
            .filter_map(|i| {
                self.store
                    .point
                    .get_with_key(Link::new(tx.point_fk.value() + i))
                    .ok()
            })
            .collect()
    }

    /// The outputs of `tx_link` itself, in index order.
    pub fn to_outputs(&self, tx_link: Link) -> Vec<Output> {
        let Some(tx) = self.to_tx(tx_link) else {
            return Vec::new();
        };
        let Some(outs) = self.store.outs.get(tx.outs_fk).ok() else {
            return Vec::new();
        };
        outs.0
            .iter()
            .filter_map(|link| self.store.output.get(*link).ok())
            .collect()
    }

    /// The output being spent by each of `tx_link`'s inputs, resolved
    /// across the `point -> tx -> outs -> output` chain, in input order.
    /// `None` at a position means the referenced prevout can't (yet) be
    /// resolved — e.g. a coinbase input. Parallelized per input since
    /// each resolution is an independent chain of table reads (spec.md
    /// §9 "rayon permitted, not required").
    pub fn to_prevouts(&self, tx_link: Link) -> Vec<Option<Output>> {
        let points = self.to_points_with_keys(tx_link);
        points
            .par_iter()
            .map(|(key, _point)| self.resolve_prevout(key.hash, key.index))
            .collect()
    }

    fn resolve_prevout(&self, hash: [u8; 32], index: u32) -> Option<Output> {
        if index == crate::primitives::NULL_INDEX {
            return None; // coinbase input: no real prevout
        }
        let owner_link = self.store.tx.first(hash);
        let owner = self.store.tx.get(owner_link).ok()?;
        let outs = self.store.outs.get(owner.outs_fk).ok()?;
        let output_link = *outs.0.get(index as usize)?;
        self.store.output.get(output_link).ok()
    }

    /// `output_link`'s identity as a prevout: its owning tx's hash and its
    /// index within that tx's `outs` list, resolved by `output.parent_fk`
    /// then a linear scan (spec.md §4.5 "Output -> spenders" step 1-2).
    pub fn to_output_index(&self, output_link: Link) -> Option<([u8; 32], u32)> {
        let output = self.store.output.get(output_link).ok()?;
        let (key, tx) = self.store.tx.get_with_key(output.parent_fk).ok()?;
        let outs = self.store.outs.get(tx.outs_fk).ok()?;
        let index = outs.0.iter().position(|link| *link == output_link)?;
        Some((key.0, index as u32))
    }

    /// Every `point` record link spending `output_link` — ordinarily one
    /// entry; more than one only across forks that both spend it. A
    /// coinbase output can't be resolved back to an index and yields the
    /// empty set.
    pub fn to_spenders(&self, output_link: Link) -> Vec<Link> {
        let Some((hash, index)) = self.to_output_index(output_link) else {
            return Vec::new();
        };
        self.store.point.spenders(hash, index)
    }

    // -- chain management --------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.store.candidate.height() > 0 && self.store.confirmed.height() > 0
    }

    /// Seed an empty archive with a genesis header at height 0 on both
    /// chains, plus its (empty-input) coinbase tx and `txs` record — the
    /// genesis block is associated from the start, not merely candidated
    /// (spec.md §4.6 "set the genesis block into header/tx/txs tables").
    pub fn initialize(&self, genesis: &Header) -> Option<Link> {
        if self.is_initialized() {
            return None;
        }
        let hash = genesis_hash(genesis);
        let link = self.store.header.put(hash, genesis).ok()?;

        let outs_link = self.store.outs.put(&Outs(Vec::new())).ok()?;
        let coinbase = Tx {
            point_fk: Link::new(0),
            points_count: 0,
            outs_fk: outs_link,
        };
        let tx_link = self.store.tx.put(hash, &coinbase).ok()?;
        self.store.txs.put(link, &Txs(vec![tx_link])).ok()?;

        self.store.candidate.push(link).ok()?;
        self.store.confirmed.push(link).ok()?;
        Some(link)
    }

    pub fn get_top_candidate(&self) -> Option<(u64, Link)> {
        let height = self.store.candidate.height();
        if height == 0 {
            return None;
        }
        Some((height - 1, self.store.candidate.top()?))
    }

    pub fn get_top_confirmed(&self) -> Option<(u64, Link)> {
        let height = self.store.confirmed.height();
        if height == 0 {
            return None;
        }
        Some((height - 1, self.store.confirmed.top()?))
    }

    /// Push `header_link` onto the candidate chain, tracking it as
    /// unassociated until its `txs` record lands. `flags`/`median_time_past`
    /// are the caller's validation-state context for this header (its
    /// `timestamp` is read back from the stored header itself).
    pub fn push_candidate(
        &self,
        header_link: Link,
        hash: [u8; 32],
        flags: u32,
        median_time_past: u32,
    ) -> Option<u64> {
        let timestamp = self.to_header(header_link)?.timestamp;
        let height = self.store.candidate.push(header_link).ok()?;
        self.associations.lock().insert(Association {
            link: header_link,
            hash,
            context: Context {
                flags,
                height,
                timestamp,
                median_time_past,
            },
        });
        Some(height)
    }

    pub fn pop_candidate(&self) -> Option<Link> {
        let height = self.store.candidate.height().checked_sub(1)?;
        self.associations.lock().remove_height(height);
        self.store.candidate.pop().ok()
    }

    pub fn push_confirmed(&self, header_link: Link) -> Option<u64> {
        self.store.confirmed.push(header_link).ok()
    }

    pub fn pop_confirmed(&self) -> Option<Link> {
        self.store.confirmed.pop().ok()
    }

    /// Mark the candidate at `height` as associated (its `txs` record now
    /// exists) — removes it from the unassociated tracking set.
    pub fn mark_associated(&self, height: u64) {
        self.associations.lock().remove_height(height);
    }

    /// The height of the highest confirmed/candidate ancestor common to
    /// both chains (a linear scan from the top down, since neither chain
    /// exposes reverse links beyond its own header records).
    pub fn get_fork(&self) -> u64 {
        let top = self.store.candidate.height().min(self.store.confirmed.height());
        let mut height = top;
        while height > 0 {
            let h = height - 1;
            match (self.to_candidate(h), self.to_confirmed(h)) {
                (Some(c), Some(f)) if c == f => return h,
                _ => height -= 1,
            }
        }
        0
    }

    /// Walk the candidate chain from `from` upward, stopping at the first
    /// height whose `txs` record doesn't exist or at the chain tip; return
    /// the stopping height. `from` beyond the current top candidate is
    /// returned unchanged (it's unassociated, but a correct answer); a
    /// terminal `from` (`u64::MAX`) always returns `u64::MAX`.
    pub fn get_top_associated_from(&self, from: u64) -> u64 {
        if from == u64::MAX {
            return u64::MAX;
        }
        let Some((top, _)) = self.get_top_candidate() else {
            return from;
        };
        if from > top {
            return from;
        }
        let mut height = from;
        while height < top {
            let next = height + 1;
            match self.to_candidate(next) {
                Some(link) if self.to_txs(link).is_some() => height = next,
                _ => break,
            }
        }
        height
    }

    pub fn get_top_associated(&self) -> u64 {
        self.get_top_associated_from(0)
    }

    /// `{link, hash, context}` for every candidate header above `height`
    /// lacking a `txs` record, ordered by height ascending, truncated to
    /// `limit` if given.
    pub fn get_unassociated_above(&self, from: u64, limit: Option<usize>) -> Vec<Association> {
        self.associations.lock().above(from, limit)
    }

    pub fn get_unassociated_count_above(&self, from: u64) -> usize {
        self.associations.lock().count_above(from)
    }

    /// The candidate header hash at each height in `heights`, in the order
    /// given; heights absent from the chain are silently skipped.
    pub fn get_candidate_hashes(&self, heights: &[u64]) -> Vec<[u8; 32]> {
        self.store
            .candidate
            .hashes_for(heights)
            .into_iter()
            .filter_map(|link| self.to_header(link))
            .map(|header| header_hash(&header))
            .collect()
    }

    pub fn get_confirmed_hashes(&self, heights: &[u64]) -> Vec<[u8; 32]> {
        self.store
            .confirmed
            .hashes_for(heights)
            .into_iter()
            .filter_map(|link| self.to_header(link))
            .map(|header| header_hash(&header))
            .collect()
    }

    // -- enumeration -------------------------------------------------------

    /// Head-of-bucket links for diagnostic/coverage walks over each
    /// hashmap table (spec.md §4.5 "Enumeration").
    pub fn top_header(&self, bucket: u64) -> Link {
        self.store.header.top(bucket)
    }

    pub fn top_point(&self, bucket: u64) -> Link {
        self.store.point.top(bucket)
    }

    pub fn top_txs(&self, bucket: u64) -> Link {
        self.store.txs.top(bucket)
    }

    pub fn top_tx(&self, bucket: u64) -> Link {
        self.store.tx.top(bucket)
    }
}

/// A stand-in content hash for a header record (the real double-SHA256
/// block hash is out of scope per spec.md §1; tests key headers by this
/// function so the fork/associate/locator logic has something concrete to
/// exercise).
fn header_hash(header: &Header) -> [u8; 32] {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    header.previous_fk.value().hash(&mut hasher);
    header.merkle_root.hash(&mut hasher);
    header.timestamp.hash(&mut hasher);
    header.nonce.hash(&mut hasher);
    let digest = hasher.finish();
    let mut out = [0u8; 32];
    out[..8].copy_from_slice(&digest.to_le_bytes());
    out
}

fn genesis_hash(header: &Header) -> [u8; 32] {
    header_hash(header)
}
