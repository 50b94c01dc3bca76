//! Memory-mapped file with explicit lifecycle, fault tracking, and
//! crash-recovery semantics (spec.md §4.1).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use memmap2::MmapMut;
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, ErrorKind, Result};
use crate::file::pin::Pin;

/// Growth and sizing policy for one table's body file (spec.md §6,
/// `<table>_size` / `<table>_rate`).
#[derive(Debug, Clone, Copy)]
pub struct GrowthPolicy {
    pub min_capacity: u64,
    pub growth_ratio: f64,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        GrowthPolicy {
            min_capacity: 1 << 20,
            growth_ratio: 1.5,
        }
    }
}

/// A memory-mapped file with monotonic single-writer allocation, a sticky
/// fault code, and pin-gated remap.
pub struct Storage {
    file: File,
    path: PathBuf,
    mmap: RwLock<MmapMut>,
    /// Logical size in bytes actually written (<= mapped capacity).
    logical_size: AtomicU64,
    capacity: AtomicU64,
    policy: GrowthPolicy,
    alloc_lock: Mutex<()>,
    fault: AtomicU32,
}

impl Storage {
    /// Create a fresh, zero-length body file and map it at `min_capacity`.
    pub fn create(path: impl AsRef<Path>, policy: GrowthPolicy) -> Result<Storage> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::from_io(ErrorKind::FileOpen, e))?;

        let initial = policy.min_capacity.max(1);
        file.set_len(initial)
            .map_err(|e| Error::from_io(ErrorKind::FileGrow, e))?;

        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| Error::from_io(ErrorKind::FileMap, e))?;

        log::debug!("storage: created {}", path.display());

        Ok(Storage {
            file,
            path,
            mmap: RwLock::new(mmap),
            logical_size: AtomicU64::new(0),
            capacity: AtomicU64::new(initial),
            policy,
            alloc_lock: Mutex::new(()),
            fault: AtomicU32::new(ErrorKind::Success.to_code()),
        })
    }

    /// Open an existing body file, mapping its current on-disk size.
    pub fn open(path: impl AsRef<Path>, policy: GrowthPolicy) -> Result<Storage> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::from_io(ErrorKind::FileOpen, e))?;

        let on_disk = file
            .metadata()
            .map_err(|e| Error::from_io(ErrorKind::FileOpen, e))?
            .len();
        let capacity = on_disk.max(policy.min_capacity).max(1);
        if capacity != on_disk {
            file.set_len(capacity)
                .map_err(|e| Error::from_io(ErrorKind::FileGrow, e))?;
        }

        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| Error::from_io(ErrorKind::FileMap, e))?;

        log::debug!("storage: opened {} ({} bytes mapped)", path.display(), capacity);

        Ok(Storage {
            file,
            path,
            mmap: RwLock::new(mmap),
            logical_size: AtomicU64::new(0),
            capacity: AtomicU64::new(capacity),
            policy,
            alloc_lock: Mutex::new(()),
            fault: AtomicU32::new(ErrorKind::Success.to_code()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes logically in use (tracked independently from mapped capacity;
    /// the head file persists this value across clean shutdowns).
    pub fn size(&self) -> u64 {
        self.logical_size.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity.load(Ordering::Acquire)
    }

    /// `size() / record_size`, for fixed-size tables.
    pub fn count(&self, record_size: usize) -> u64 {
        debug_assert_ne!(record_size, 0);
        self.size() / record_size as u64
    }

    /// Adopt a logical size recorded in a head file (used by `restore`).
    pub fn set_logical_size(&self, size: u64) {
        self.logical_size.store(size, Ordering::Release);
    }

    fn latch_fault(&self, kind: ErrorKind) -> Error {
        // Sticky: only the first non-success code is retained.
        let _ = self.fault.compare_exchange(
            ErrorKind::Success.to_code(),
            kind.to_code(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        log::error!("storage fault latched on {}: {kind}", self.path.display());
        Error::new(kind)
    }

    pub fn get_fault(&self) -> ErrorKind {
        ErrorKind::from_code(self.fault.load(Ordering::Acquire))
    }

    fn check_fault(&self) -> Result<()> {
        let kind = self.get_fault();
        if kind.is_success() {
            Ok(())
        } else {
            Err(Error::new(kind))
        }
    }

    /// Reserve `count` fixed-size records, returning the starting link
    /// (the record index, not a byte offset).
    pub fn allocate_fixed(&self, count: u64, record_size: usize) -> Result<u64> {
        self.check_fault()?;
        debug_assert_ne!(record_size, 0);
        let _guard = self.alloc_lock.lock();
        let start = self.logical_size.load(Ordering::Acquire);
        let bytes = count * record_size as u64;
        let end = start + bytes;
        self.ensure_capacity(end)?;
        self.logical_size.store(end, Ordering::Release);
        Ok(start / record_size as u64)
    }

    /// Reserve `len` bytes for a slab record, returning the starting
    /// offset (the link for slab tables is the raw byte offset).
    pub fn allocate_slab(&self, len: u64) -> Result<u64> {
        self.check_fault()?;
        let _guard = self.alloc_lock.lock();
        let start = self.logical_size.load(Ordering::Acquire);
        let end = start + len;
        self.ensure_capacity(end)?;
        self.logical_size.store(end, Ordering::Release);
        Ok(start)
    }

    /// Grow the mapping (geometric factor, §4.1 remap policy) so that it
    /// covers at least `needed` bytes. Must be called with `alloc_lock` held.
    fn ensure_capacity(&self, needed: u64) -> Result<()> {
        let current = self.capacity.load(Ordering::Acquire);
        if needed <= current {
            return Ok(());
        }

        let mut new_capacity = current.max(self.policy.min_capacity).max(1);
        while new_capacity < needed {
            new_capacity = ((new_capacity as f64) * self.policy.growth_ratio).ceil() as u64;
        }

        log::debug!(
            "storage: growing {} from {} to {} bytes",
            self.path.display(),
            current,
            new_capacity
        );

        self.file
            .set_len(new_capacity)
            .map_err(|e| self.latch_fault_io(ErrorKind::FileGrow, e))?;

        // Exclusive lock: blocks until every outstanding Pin is dropped.
        let mut guard = self.mmap.write();
        let new_map =
            unsafe { MmapMut::map_mut(&self.file) }.map_err(|e| self.latch_fault_io(ErrorKind::FileMap, e))?;
        *guard = new_map;
        self.capacity.store(new_capacity, Ordering::Release);
        Ok(())
    }

    fn latch_fault_io(&self, kind: ErrorKind, source: std::io::Error) -> Error {
        let _ = self.latch_fault(kind);
        Error::from_io(kind, source)
    }

    /// Pin and return the byte range `[offset, offset+len)`.
    pub fn get(&self, offset: u64, len: usize) -> Result<Pin<'_>> {
        self.check_fault()?;
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| Error::new(ErrorKind::InvalidLink))?;
        if end > self.size() {
            return Err(Error::new(ErrorKind::InvalidLink));
        }
        let guard = self.mmap.read();
        if (end as usize) > guard.len() {
            drop(guard);
            return Err(self.latch_fault(ErrorKind::IntegrityFailure));
        }
        Ok(Pin {
            guard,
            offset: offset as usize,
            len,
        })
    }

    /// Shrink or (rarely) grow the logical size directly, bypassing the
    /// allocator. Used by `truncate`/crash recovery.
    pub fn truncate(&self, new_size: u64) -> Result<()> {
        self.check_fault()?;
        let _guard = self.alloc_lock.lock();
        if new_size > self.capacity.load(Ordering::Acquire) {
            self.ensure_capacity(new_size)?;
        }
        self.logical_size.store(new_size, Ordering::Release);
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.check_fault()?;
        let guard = self.mmap.read();
        guard
            .flush()
            .map_err(|e| self.latch_fault_io(ErrorKind::FileSync, e))
    }

    /// Re-establish the mapping (used if the backing file was replaced
    /// externally, e.g. by a `restore`).
    pub fn reload(&self) -> Result<()> {
        self.check_fault()?;
        let metadata = self
            .file
            .metadata()
            .map_err(|e| self.latch_fault_io(ErrorKind::FileOpen, e))?;
        let mut guard = self.mmap.write();
        let new_map =
            unsafe { MmapMut::map_mut(&self.file) }.map_err(|e| self.latch_fault_io(ErrorKind::FileMap, e))?;
        *guard = new_map;
        self.capacity.store(metadata.len(), Ordering::Release);
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.flush()
    }

    /// Available bytes on the backing filesystem.
    pub fn get_space(&self) -> Result<u64> {
        crate::file::utilities::space(&self.path)
    }
}
