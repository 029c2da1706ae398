//! Bounds and shared state that read the same on native and browser targets.
//!
//! Credential invokers, fetchers and signal stores cross threads on native
//! targets. On `wasm32` everything lives on the browser's single thread and
//! JS handles are neither `Send` nor `Sync`, so the bounds collapse to
//! nothing there.

#[cfg(not(target_arch = "wasm32"))]
mod bounds {
    /// `Send` on native targets, no bound on `wasm32`.
    pub trait ConditionalSend: Send {}

    impl<S: Send> ConditionalSend for S {}

    /// `Send + Sync` on native targets, no bound on `wasm32`.
    pub trait ConditionalSync: Send + Sync {}

    impl<S: Send + Sync> ConditionalSync for S {}
}

#[cfg(target_arch = "wasm32")]
mod bounds {
    /// `Send` on native targets, no bound on `wasm32`.
    pub trait ConditionalSend {}

    impl<S> ConditionalSend for S {}

    /// `Send + Sync` on native targets, no bound on `wasm32`.
    pub trait ConditionalSync {}

    impl<S> ConditionalSync for S {}
}

pub use bounds::{ConditionalSend, ConditionalSync};

#[cfg(not(target_arch = "wasm32"))]
type Cell<T> = std::sync::RwLock<T>;
#[cfg(target_arch = "wasm32")]
type Cell<T> = std::cell::RefCell<T>;

/// Guard handed out by [`SharedCell::read`].
#[cfg(not(target_arch = "wasm32"))]
pub type ReadGuard<'a, T> = std::sync::RwLockReadGuard<'a, T>;
/// Guard handed out by [`SharedCell::read`].
#[cfg(target_arch = "wasm32")]
pub type ReadGuard<'a, T> = std::cell::Ref<'a, T>;

/// Guard handed out by [`SharedCell::write`].
#[cfg(not(target_arch = "wasm32"))]
pub type WriteGuard<'a, T> = std::sync::RwLockWriteGuard<'a, T>;
/// Guard handed out by [`SharedCell::write`].
#[cfg(target_arch = "wasm32")]
pub type WriteGuard<'a, T> = std::cell::RefMut<'a, T>;

/// Interior mutability for signal tables and recorded calls.
///
/// Backed by an `RwLock` on native targets and a `RefCell` on `wasm32`.
/// Guards must be dropped before the next `.await`.
///
/// ```
/// use passkey_common::SharedCell;
///
/// let notified = SharedCell::new(Vec::<String>::new());
/// notified.write().push("$sessionSignal".into());
///
/// assert_eq!(notified.snapshot(), vec!["$sessionSignal".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct SharedCell<T>(Cell<T>);

impl<T> SharedCell<T> {
    /// Wrap `value`.
    pub fn new(value: T) -> Self {
        Self(Cell::new(value))
    }

    /// Shared access to the value.
    ///
    /// A lock poisoned by a panicking writer is recovered: the cell only
    /// ever holds counters, maps of signals and call logs.
    pub fn read(&self) -> ReadGuard<'_, T> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.0.read().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
        #[cfg(target_arch = "wasm32")]
        {
            self.0.borrow()
        }
    }

    /// Exclusive access to the value.
    pub fn write(&self) -> WriteGuard<'_, T> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.0.write().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
        #[cfg(target_arch = "wasm32")]
        {
            self.0.borrow_mut()
        }
    }

    /// A copy of the current value, taken without holding a guard.
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        T::clone(&self.read())
    }
}
