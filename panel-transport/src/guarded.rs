//! Mutex-wrapped value with scoped access

use parking_lot::Mutex;

/// Wrap any value in a mutex and guarantee it is locked on every access.
///
/// The lock is released on every exit path of the closure passed to
/// [`Guarded::apply`], including unwinding. `parking_lot` does not poison,
/// so a panicking closure leaves the value usable for the next caller.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    contents: Mutex<T>,
}

impl<T> Guarded<T> {
    pub const fn new(value: T) -> Self {
        Self {
            contents: Mutex::new(value),
        }
    }

    /// Invoke `f` with the wrapped value while locked and return its result
    pub fn apply<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut contents = self.contents.lock();
        f(&mut contents)
    }

    /// Exclusive access through a unique borrow; no locking needed
    pub fn get_mut(&mut self) -> &mut T {
        self.contents.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.contents.into_inner()
    }

    /// Get a non-locked reference to the value.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that no other thread accesses the value
    /// (through `apply` or another `unsafe_access`) while the returned
    /// reference is alive.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn unsafe_access(&self) -> &mut T {
        &mut *self.contents.data_ptr()
    }
}
