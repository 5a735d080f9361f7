//! Fixed-capacity byte ring buffer for producer/consumer data transfer.
//!
//! This crate provides a power-of-two sized circular byte buffer that moves
//! data between one writer context and one reader context (two threads, or an
//! interrupt handler and a task). Index wraparound is computed with a bitmask,
//! and every operation runs inside a single critical section guarded by a
//! pluggable lock. All modules are usable in both firmware (no_std + alloc)
//! and hosted environments.

#![no_std]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

#[macro_use]
mod trace;

/// Configuration types resolved at construction time.
///
/// Holds the per-instance capacity and full-buffer policy. The lock
/// implementation is chosen separately through the buffer's type parameter,
/// so the two concerns can be combined freely.
pub mod config;

/// Mutual-exclusion strategies consumed by the ring buffer.
///
/// Defines the `RawLock` capability set (init, acquire, release, destroy) and
/// the stock implementations: a busy-wait spinlock for bare-metal and
/// multi-core firmware, a std mutex for hosted threads, and a no-op lock for
/// single-context builds without preemption.
pub mod lock;

/// Byte ring buffer engine.
///
/// Owns the storage region and the read/write cursors, and implements the
/// all-or-nothing read and write algorithms under the buffer's lock. Capacity
/// must be a power of two so cursors wrap with `& (capacity - 1)`.
pub mod ring_buffer;

pub use config::{FullPolicy, RingConfig};
pub use lock::{LockInitError, NoLock, RawLock, SpinLock};
#[cfg(feature = "std")]
pub use lock::StdLock;
pub use ring_buffer::RingBuffer;

use core::fmt;

/// Error types returned by ring buffer operations.
///
/// Every error is reported synchronously to the immediate caller. The buffer
/// never retries or recovers on its own, and a failed operation leaves the
/// buffer state exactly as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// The requested capacity is zero or not a power of two.
    ///
    /// Construction is aborted and no buffer is returned.
    InvalidCapacity,

    /// The storage region could not be allocated.
    ///
    /// Construction is aborted cleanly; nothing is leaked.
    OutOfMemory,

    /// The lock strategy failed to initialize.
    ///
    /// The storage that was already allocated is released before this error
    /// is returned.
    LockInitFailed,

    /// A read or write was requested with a length of zero.
    ///
    /// Rejected before the lock is taken; no state changes.
    InvalidArgument,

    /// A write does not fit in the free space under the reject policy.
    ///
    /// No partial write occurs. The caller may retry after the reader drains
    /// the buffer, or drop the data.
    InsufficientSpace,

    /// A read asked for more bytes than are currently held.
    ///
    /// No bytes are copied out and the read cursor does not move.
    InsufficientData,
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidCapacity => "capacity must be a nonzero power of two",
            Self::OutOfMemory => "failed to allocate ring buffer storage",
            Self::LockInitFailed => "failed to initialize ring buffer lock",
            Self::InvalidArgument => "read or write length must be nonzero",
            Self::InsufficientSpace => "not enough free space for write",
            Self::InsufficientData => "not enough buffered data for read",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for RingError {}

impl From<LockInitError> for RingError {
    fn from(_: LockInitError) -> Self {
        Self::LockInitFailed
    }
}
