//! Double-buffered container with a lock-free consumer side
//!
//! Two slots plus an index selecting the "inner" one. The owner of
//! [`DoubleBuffered`] is the single consumer: it reads the inner slot without
//! locking and is the only party that can swap. Producers hold cheap
//! [`BufferWriter`] handles and append to the outer slot under a lock.
//!
//! ```text
//!  producers ──lock──▶ outer ┐
//!                            ├─ swap() flips the index, then clears one slot
//!  consumer  ◀──────── inner ┘
//! ```

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Containers that can be emptied in place
pub trait Clear {
    fn clear(&mut self);
}

impl<T> Clear for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self)
    }
}

impl<T> Clear for std::collections::VecDeque<T> {
    fn clear(&mut self) {
        std::collections::VecDeque::clear(self)
    }
}

impl Clear for String {
    fn clear(&mut self) {
        String::clear(self)
    }
}

/// Which slot is cleared after the roles are exchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSwap {
    /// Clear the slot that just became outer, so producers start fresh
    ClearOuter,
    /// Clear the slot that just became inner, so the next cycle starts empty
    ClearInner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ProducersWriting,
    SwapInProgress,
}

#[derive(Debug)]
struct SwapState {
    phase: Phase,
    swaps: u64,
}

struct Slots<T> {
    store: [UnsafeCell<T>; 2],
    inner_idx: AtomicUsize,
    outer_lock: Mutex<SwapState>,
    after_swap: AfterSwap,
}

// SAFETY: the outer slot is only touched while `outer_lock` is held, and the
// inner slot only through `&mut DoubleBuffered`, of which there is exactly one.
unsafe impl<T: Send> Sync for Slots<T> {}

impl<T> Slots<T> {
    fn lock_outer(&self) -> OuterGuard<'_, T> {
        let state = self.outer_lock.lock();
        debug_assert_eq!(state.phase, Phase::ProducersWriting);
        let outer = 1 - self.inner_idx.load(Ordering::Acquire);
        // SAFETY: the index only changes under `outer_lock`, which we hold, and
        // the consumer never touches the outer slot.
        let slot = unsafe { &mut *self.store[outer].get() };
        OuterGuard {
            _state: state,
            slot,
        }
    }
}

/// Locked view of the outer slot
pub struct OuterGuard<'a, T> {
    _state: MutexGuard<'a, SwapState>,
    slot: &'a mut T,
}

impl<T> Deref for OuterGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.slot
    }
}

impl<T> DerefMut for OuterGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.slot
    }
}

/// Consumer side and owner of a double buffer
pub struct DoubleBuffered<T> {
    slots: Arc<Slots<T>>,
}

impl<T: Clear + Default> DoubleBuffered<T> {
    pub fn new(after_swap: AfterSwap) -> Self {
        Self::with_slots(T::default(), T::default(), after_swap)
    }
}

impl<T: Clear> DoubleBuffered<T> {
    pub fn with_slots(inner: T, outer: T, after_swap: AfterSwap) -> Self {
        Self {
            slots: Arc::new(Slots {
                store: [UnsafeCell::new(inner), UnsafeCell::new(outer)],
                inner_idx: AtomicUsize::new(0),
                outer_lock: Mutex::new(SwapState {
                    phase: Phase::ProducersWriting,
                    swaps: 0,
                }),
                after_swap,
            }),
        }
    }

    /// Handle for producer threads
    pub fn writer(&self) -> BufferWriter<T> {
        BufferWriter {
            slots: Arc::clone(&self.slots),
        }
    }

    /// The inner slot, without locking
    pub fn inner(&mut self) -> &mut T {
        let idx = self.slots.inner_idx.load(Ordering::Acquire);
        // SAFETY: `&mut self` excludes a concurrent swap, and producers only
        // reach the other slot.
        unsafe { &mut *self.slots.store[idx].get() }
    }

    /// The outer slot, locked for the lifetime of the guard
    pub fn outer(&self) -> OuterGuard<'_, T> {
        self.slots.lock_outer()
    }

    pub fn outer_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.slots.lock_outer())
    }

    /// Exchange the inner and outer slots, then apply the clearing policy
    pub fn swap(&mut self) {
        let mut state = self.slots.outer_lock.lock();
        state.phase = Phase::SwapInProgress;

        let inner = 1 - self.slots.inner_idx.load(Ordering::Relaxed);
        self.slots.inner_idx.store(inner, Ordering::Release);

        let cleared = match self.slots.after_swap {
            AfterSwap::ClearOuter => 1 - inner,
            AfterSwap::ClearInner => inner,
        };
        // SAFETY: we hold the lock (no producer) and `&mut self` (no consumer).
        unsafe { (*self.slots.store[cleared].get()).clear() };

        state.swaps += 1;
        state.phase = Phase::ProducersWriting;
    }

    /// Physical slot (0 or 1) currently serving as inner
    pub fn inner_index(&self) -> usize {
        self.slots.inner_idx.load(Ordering::Acquire)
    }

    pub fn after_swap(&self) -> AfterSwap {
        self.slots.after_swap
    }

    pub fn swap_count(&self) -> u64 {
        self.slots.outer_lock.lock().swaps
    }
}

/// Producer handle; appends to the outer slot under the swap lock
pub struct BufferWriter<T> {
    slots: Arc<Slots<T>>,
}

impl<T> Clone for BufferWriter<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> BufferWriter<T> {
    pub fn outer(&self) -> OuterGuard<'_, T> {
        self.slots.lock_outer()
    }

    pub fn outer_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.slots.lock_outer())
    }
}
