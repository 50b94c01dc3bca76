//! Head file: `body_logical_size` plus, for hashmap tables, the bucket
//! array (spec.md §3.2, §6 "Head file of hashmap").
//!
//! Mirrors the teacher's `shm::layout`/`shm::region` split: fixed
//! `#[repr(C)]`-style offsets computed by free functions, raw pointer
//! access guarded by a caller-held lock rather than by the type system
//! (bucket writes are synchronized by a per-bucket mutex one layer up, in
//! [`crate::primitives::hashmap`]).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{Error, ErrorKind, Result};
use crate::link::{Link, LinkSize};

const SIZE_FIELD_BYTES: usize = 8;

pub fn bucket_offset(bucket: u64, link_size: LinkSize) -> usize {
    SIZE_FIELD_BYTES + bucket as usize * link_size.width()
}

pub fn head_file_len(buckets: u64, link_size: LinkSize) -> u64 {
    SIZE_FIELD_BYTES as u64 + buckets * link_size.width() as u64
}

/// The head file for a nomap table (no bucket array) or a hashmap table
/// (`buckets > 0`).
pub struct HeadFile {
    mmap: MmapMut,
    path: PathBuf,
    buckets: u64,
    link_size: LinkSize,
}

impl HeadFile {
    pub fn create(path: impl AsRef<Path>, buckets: u64, link_size: LinkSize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let total = head_file_len(buckets, link_size);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::from_io(ErrorKind::FileOpen, e))?;
        file.set_len(total)
            .map_err(|e| Error::from_io(ErrorKind::FileGrow, e))?;

        let mut mmap =
            unsafe { MmapMut::map_mut(&file) }.map_err(|e| Error::from_io(ErrorKind::FileMap, e))?;
        mmap.fill(0);

        let head = HeadFile {
            mmap,
            path,
            buckets,
            link_size,
        };
        head.set_body_logical_size(0);
        for b in 0..buckets {
            head.set_bucket_head(b, Link::terminal(link_size));
        }
        head.flush()?;
        Ok(head)
    }

    pub fn open(path: impl AsRef<Path>, buckets: u64, link_size: LinkSize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let expected = head_file_len(buckets, link_size);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::from_io(ErrorKind::FileOpen, e))?;
        let actual = file
            .metadata()
            .map_err(|e| Error::from_io(ErrorKind::FileOpen, e))?
            .len();
        if actual != expected {
            log::error!(
                "head file {} has length {} but expected {} for {} buckets",
                path.display(),
                actual,
                expected,
                buckets
            );
            return Err(Error::new(ErrorKind::IntegrityFailure));
        }

        let mmap =
            unsafe { MmapMut::map_mut(&file) }.map_err(|e| Error::from_io(ErrorKind::FileMap, e))?;

        Ok(HeadFile {
            mmap,
            path,
            buckets,
            link_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn buckets(&self) -> u64 {
        self.buckets
    }

    pub fn link_size(&self) -> LinkSize {
        self.link_size
    }

    pub fn body_logical_size(&self) -> u64 {
        u64::from_le_bytes(self.mmap[0..8].try_into().unwrap())
    }

    /// # Safety (synchronization)
    /// Must only be called while holding the exclusive lock `backup`/`close`
    /// take over the head file (spec.md §5 "readers never write to head").
    pub fn set_body_logical_size(&self, value: u64) {
        unsafe {
            let base = self.mmap.as_ptr() as *mut u8;
            std::ptr::copy_nonoverlapping(value.to_le_bytes().as_ptr(), base, 8);
        }
    }

    pub fn bucket_head(&self, bucket: u64) -> Link {
        debug_assert!(bucket < self.buckets);
        let offset = bucket_offset(bucket, self.link_size);
        self.link_size.read(&self.mmap[offset..offset + self.link_size.width()])
    }

    /// # Safety (synchronization)
    /// Caller must hold that bucket's insertion mutex (spec.md §4.4).
    pub fn set_bucket_head(&self, bucket: u64, link: Link) {
        debug_assert!(bucket < self.buckets);
        let offset = bucket_offset(bucket, self.link_size);
        let width = self.link_size.width();
        unsafe {
            let base = (self.mmap.as_ptr() as *mut u8).add(offset);
            let slice = std::slice::from_raw_parts_mut(base, width);
            self.link_size.write(link, slice);
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| Error::from_io(ErrorKind::FileSync, e))
    }
}
