//! RAII pin over a byte range of a memory-mapped [`super::storage::Storage`].
//!
//! Design notes §9: "a naive raw pointer exposed by `get` is unsafe; design
//! the return type to be a RAII-style pin." A [`Pin`] *is* the
//! `parking_lot::RwLockReadGuard` over the mapping — holding one blocks the
//! writer's remap path (which takes the write side) for exactly as long as
//! the pin is alive, which is the pin-count behavior spec.md §4.1 describes.

use memmap2::MmapMut;
use parking_lot::RwLockReadGuard;

pub struct Pin<'a> {
    pub(super) guard: RwLockReadGuard<'a, MmapMut>,
    pub(super) offset: usize,
    pub(super) len: usize,
}

impl<'a> Pin<'a> {
    pub fn as_slice(&self) -> &[u8] {
        &self.guard[self.offset..self.offset + self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mutable access to the pinned range.
    ///
    /// # Safety
    /// The store's single-writer assumption (spec.md §9) is load-bearing
    /// here: only the writer thread may call this, and never concurrently
    /// with another call targeting an overlapping range. Readers only ever
    /// obtain a [`Pin`] through the immutable accessor.
    pub unsafe fn as_mut_slice(&self) -> &mut [u8] {
        let base = self.guard.as_ptr() as *mut u8;
        std::slice::from_raw_parts_mut(base.add(self.offset), self.len)
    }
}

impl<'a> std::ops::Deref for Pin<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}
