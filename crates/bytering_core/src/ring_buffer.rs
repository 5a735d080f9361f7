use crate::RingError;
use crate::config::{FullPolicy, RingConfig};
use crate::lock::RawLock;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;

/// Cursor and storage state, touched only while the lock is held.
struct Inner {
    storage: Box<[u8]>,
    read: usize,
    write: usize,
}

impl Inner {
    #[inline(always)]
    fn occupied(&self, mask: usize) -> usize {
        self.write.wrapping_sub(self.read) & mask
    }
}

/// Fixed-capacity byte ring buffer guarded by a single lock.
///
/// One slot is always left empty so that `read == write` means empty and
/// `write + 1 == read` (masked) means full, without a separate counter. At
/// most `capacity - 1` bytes are buffered at once.
///
/// Reads and writes are all-or-nothing: a request that cannot be satisfied in
/// full fails and leaves the buffer untouched. Neither call waits for space or
/// data to appear.
pub struct RingBuffer<L: RawLock> {
    inner: UnsafeCell<Inner>,
    capacity: usize,
    mask: usize,
    policy: FullPolicy,
    lock: L,
}

// SAFETY: every access to `inner` through `&self` happens while holding a
// guard from `lock`, and `RawLock` guarantees exclusion for Sync locks.
unsafe impl<L: RawLock + Sync> Sync for RingBuffer<L> {}

impl<L: RawLock> RingBuffer<L> {
    /// Creates a buffer of `capacity` bytes with the reject policy.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        Self::with_config(RingConfig::new(capacity))
    }

    /// Creates a buffer, initializing a fresh lock with `L::init`.
    ///
    /// If the lock fails to initialize, the storage allocated a moment
    /// earlier is released before `LockInitFailed` is returned.
    pub fn with_config(config: RingConfig) -> Result<Self, RingError> {
        config.validate()?;
        let storage = alloc_zeroed(config.capacity)?;
        let lock = L::init()?;
        Ok(Self::assemble(config, storage, lock))
    }

    /// Creates a buffer around an already constructed lock.
    pub fn with_lock(config: RingConfig, lock: L) -> Result<Self, RingError> {
        config.validate()?;
        let storage = alloc_zeroed(config.capacity)?;
        Ok(Self::assemble(config, storage, lock))
    }

    fn assemble(config: RingConfig, storage: Box<[u8]>, lock: L) -> Self {
        ring_trace!(
            "created ring buffer: capacity={} policy={:?}",
            config.capacity,
            config.policy
        );
        Self {
            inner: UnsafeCell::new(Inner {
                storage,
                read: 0,
                write: 0,
            }),
            capacity: config.capacity,
            mask: config.capacity - 1,
            policy: config.policy,
            lock,
        }
    }

    /// Releases the storage and the lock, and resets the buffer to an empty,
    /// zero-capacity state. Calling it again does nothing.
    ///
    /// A destroyed buffer rejects every write and every read.
    pub fn destroy(&mut self) {
        if self.capacity == 0 {
            return;
        }
        let inner = self.inner.get_mut();
        inner.storage = Box::default();
        inner.read = 0;
        inner.write = 0;
        self.lock.destroy();
        self.capacity = 0;
        self.mask = 0;
        ring_trace!("destroyed ring buffer");
    }

    /// Runs `f` inside the critical section.
    #[inline(always)]
    fn locked<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let _guard = self.lock.acquire();
        // SAFETY: the guard grants exclusive access until it drops, and `f`
        // cannot smuggle the reference out past this call.
        let inner = unsafe { &mut *self.inner.get() };
        f(inner)
    }

    /// Appends all of `data`, or nothing.
    ///
    /// Under `FullPolicy::Reject` a write larger than the free space fails
    /// with `InsufficientSpace`. Under `FullPolicy::Overwrite` the oldest
    /// unread bytes are discarded to make room and the write always succeeds.
    pub fn write(&self, data: &[u8]) -> Result<(), RingError> {
        let len = data.len();
        if len == 0 {
            return Err(RingError::InvalidArgument);
        }

        ring_trace!("write: acquiring lock ({} bytes)", len);
        let result = self.locked(|inner| {
            if self.capacity == 0 {
                return Err(RingError::InsufficientSpace);
            }

            let available = self.capacity - inner.occupied(self.mask) - 1;
            if available < len {
                match self.policy {
                    FullPolicy::Reject => {
                        ring_trace!("write: {} bytes free, {} requested", available, len);
                        return Err(RingError::InsufficientSpace);
                    }
                    FullPolicy::Overwrite => {
                        let excess = len - available;
                        inner.read = inner.read.wrapping_add(excess) & self.mask;
                        ring_trace!("write: discarded {} oldest bytes", excess);
                    }
                }
            }

            // A write longer than the storage only leaves its tail behind.
            let skip = len.saturating_sub(self.capacity);
            let start = inner.write.wrapping_add(skip) & self.mask;
            copy_in(&mut inner.storage, start, &data[skip..]);
            inner.write = inner.write.wrapping_add(len) & self.mask;
            Ok(())
        });
        ring_trace!("write: lock released");
        result
    }

    /// Fills `out` entirely from the oldest buffered bytes, or copies nothing.
    pub fn read(&self, out: &mut [u8]) -> Result<(), RingError> {
        let len = out.len();
        if len == 0 {
            return Err(RingError::InvalidArgument);
        }

        ring_trace!("read: acquiring lock ({} bytes)", len);
        let result = self.locked(|inner| {
            let occupied = inner.occupied(self.mask);
            if occupied < len {
                ring_trace!("read: {} bytes buffered, {} requested", occupied, len);
                return Err(RingError::InsufficientData);
            }

            copy_out(&inner.storage, inner.read, out);
            inner.read = inner.read.wrapping_add(len) & self.mask;
            Ok(())
        });
        ring_trace!("read: lock released");
        result
    }

    /// Number of bytes written and not yet read.
    pub fn occupied_length(&self) -> usize {
        self.locked(|inner| inner.occupied(self.mask))
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.locked(|inner| inner.read == inner.write)
    }

    /// True when `capacity - 1` bytes are buffered. Always false once
    /// destroyed.
    pub fn is_full(&self) -> bool {
        if self.capacity == 0 {
            return false;
        }
        self.locked(|inner| (inner.write.wrapping_add(1) & self.mask) == inner.read)
    }

    /// Free bytes a reject-policy write could use right now.
    pub fn available(&self) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        self.locked(|inner| self.capacity - inner.occupied(self.mask) - 1)
    }

    /// Storage size in bytes; zero once destroyed.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of bytes that can be buffered at once.
    #[inline(always)]
    pub fn usable_capacity(&self) -> usize {
        self.capacity.saturating_sub(1)
    }

    /// Full-buffer policy fixed at construction.
    #[inline(always)]
    pub fn policy(&self) -> FullPolicy {
        self.policy
    }

    /// True after `destroy` has run.
    #[inline(always)]
    pub fn is_destroyed(&self) -> bool {
        self.capacity == 0
    }
}

impl<L: RawLock> Drop for RingBuffer<L> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn alloc_zeroed(capacity: usize) -> Result<Box<[u8]>, RingError> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(capacity)
        .map_err(|_| RingError::OutOfMemory)?;
    vec.resize(capacity, 0);
    Ok(vec.into_boxed_slice())
}

/// Copies `src` into `storage` starting at slot `start`, wrapping once.
/// `src` must not be longer than `storage`.
#[inline(always)]
fn copy_in(storage: &mut [u8], start: usize, src: &[u8]) {
    let first = src.len().min(storage.len() - start);
    let (head, tail) = src.split_at(first);
    storage[start..start + first].copy_from_slice(head);
    storage[..tail.len()].copy_from_slice(tail);
}

/// Copies `out.len()` bytes from `storage` starting at slot `start`,
/// wrapping once.
#[inline(always)]
fn copy_out(storage: &[u8], start: usize, out: &mut [u8]) {
    let first = out.len().min(storage.len() - start);
    let (head, tail) = out.split_at_mut(first);
    head.copy_from_slice(&storage[start..start + first]);
    let rest = tail.len();
    tail.copy_from_slice(&storage[..rest]);
}
