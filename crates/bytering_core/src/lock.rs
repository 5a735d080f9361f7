//! Lock strategies for the ring buffer's critical section.
//!
//! The ring buffer never knows which mechanism protects it. It calls `init`
//! once at construction, `acquire` around every operation, and `destroy` when
//! the buffer is torn down. Release happens when the guard returned by
//! `acquire` is dropped, so every exit path of an operation unlocks.

use core::cell::Cell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

/// Returned by `RawLock::init` when the underlying primitive cannot be set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInitError;

/// Mutual-exclusion capability set consumed by `RingBuffer`.
///
/// # Safety
///
/// For types that are `Sync`, at most one guard returned by `acquire` may be
/// live at any time across all threads sharing the lock. The ring buffer
/// relies on this to hand out mutable access to its cursors and storage.
/// Types that cannot uphold this across threads must not be `Sync`.
pub unsafe trait RawLock: Sized {
    /// Holding this value means holding the lock. Dropping it releases.
    type Guard<'a>
    where
        Self: 'a;

    /// Sets up the primitive.
    fn init() -> Result<Self, LockInitError>;

    /// Blocks until the lock is held.
    fn acquire(&self) -> Self::Guard<'_>;

    /// Tears the primitive down. Called at most once per buffer.
    fn destroy(&mut self) {}
}

/// Busy-wait lock for bare-metal and multi-core firmware.
///
/// Uses an atomic flag and compare-and-swap. Suitable when no scheduler is
/// available to park a waiting context, or when critical sections are short
/// enough that spinning is cheaper than a context switch.
pub struct SpinLock {
    /// False means unlocked, true means locked.
    locked: AtomicBool,
}

impl SpinLock {
    /// Creates an unlocked spinlock.
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Returns whether some context currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the spinlock on drop.
pub struct SpinGuard<'a> {
    locked: &'a AtomicBool,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.locked.store(false, Ordering::Release);
    }
}

// SAFETY: compare_exchange admits exactly one context into the critical
// section; the flag is cleared only by the guard that set it.
unsafe impl RawLock for SpinLock {
    type Guard<'a> = SpinGuard<'a>;

    fn init() -> Result<Self, LockInitError> {
        Ok(Self::new())
    }

    fn acquire(&self) -> SpinGuard<'_> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Spin on a plain load until the holder releases.
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
        SpinGuard {
            locked: &self.locked,
        }
    }
}

/// No-op lock for single-context builds without preemption.
///
/// Every operation does nothing. The type is `!Sync`, so a
/// buffer using it cannot be shared across threads.
#[derive(Default)]
pub struct NoLock {
    _not_sync: PhantomData<Cell<()>>,
}

impl NoLock {
    /// Creates the no-op lock.
    pub const fn new() -> Self {
        Self {
            _not_sync: PhantomData,
        }
    }
}

/// Guard of `NoLock`; dropping it does nothing.
pub struct NoLockGuard;

// SAFETY: NoLock is !Sync, so all guards are taken on one thread, and the
// ring buffer never nests acquisitions.
unsafe impl RawLock for NoLock {
    type Guard<'a> = NoLockGuard;

    fn init() -> Result<Self, LockInitError> {
        Ok(Self::new())
    }

    #[inline(always)]
    fn acquire(&self) -> NoLockGuard {
        NoLockGuard
    }
}

#[cfg(feature = "std")]
pub use self::std_lock::StdLock;

#[cfg(feature = "std")]
mod std_lock {
    use super::{LockInitError, RawLock};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// OS mutex for hosted threads. Waiters are parked by the scheduler.
    #[derive(Default)]
    pub struct StdLock {
        inner: Mutex<()>,
    }

    impl StdLock {
        /// Creates an unlocked mutex.
        pub const fn new() -> Self {
            Self {
                inner: Mutex::new(()),
            }
        }
    }

    // SAFETY: std::sync::Mutex provides exclusion across threads.
    unsafe impl RawLock for StdLock {
        type Guard<'a> = MutexGuard<'a, ()>;

        fn init() -> Result<Self, LockInitError> {
            Ok(Self::new())
        }

        fn acquire(&self) -> MutexGuard<'_, ()> {
            // The mutex protects no data of its own; a panic in another
            // holder cannot leave anything half-updated behind it.
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::vec::Vec;

    #[test]
    fn spin_guard_releases_on_drop() {
        let lock = SpinLock::init().unwrap();
        {
            let _g = lock.acquire();
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        let _g = lock.acquire();
        assert!(lock.is_locked());
    }

    #[test]
    fn spin_lock_excludes_concurrent_holders() {
        let lock = Arc::new(SpinLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let _g = lock.acquire();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(!lock.is_locked());
    }

    #[test]
    fn no_lock_acquire_is_reentrant_noop() {
        let lock = NoLock::init().unwrap();
        let _a = lock.acquire();
        let _b = lock.acquire();
    }

    #[cfg(feature = "std")]
    #[test]
    fn std_lock_recovers_from_poison() {
        let lock = Arc::new(StdLock::init().unwrap());
        let poisoner = lock.clone();
        let _ = thread::spawn(move || {
            let _g = poisoner.acquire();
            panic!("poison the mutex");
        })
        .join();
        let _g = lock.acquire();
    }
}
