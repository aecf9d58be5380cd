//! Fixed table of mutexes selected by hash.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use parking_lot::{Mutex, MutexGuard};

/// Number of slots in a [`StripedLock`].
pub const STRIPE_COUNT: usize = 1024;

/// A fixed table of independent mutexes indexed by `hash % STRIPE_COUNT`.
///
/// Holding the guard for a key serializes every other holder of a key in the
/// same slot. Distinct keys may share a slot; that only costs contention.
/// The guards are not reentrant, so never hold two at once.
pub struct StripedLock {
    slots: Box<[Mutex<()>]>,
}

impl fmt::Debug for StripedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripedLock")
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl Default for StripedLock {
    fn default() -> Self {
        Self::new()
    }
}

impl StripedLock {
    /// Allocate all slots up front.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: (0..STRIPE_COUNT).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Lock the slot for a precomputed hash.
    pub fn acquire(&self, hash: u64) -> MutexGuard<'_, ()> {
        self.slots[Self::slot(hash)].lock()
    }

    /// Lock the slot for a string key.
    pub fn acquire_key(&self, key: &str) -> MutexGuard<'_, ()> {
        self.acquire(hash_key(key))
    }

    fn slot(hash: u64) -> usize {
        usize::try_from(hash % STRIPE_COUNT as u64).unwrap_or_default()
    }
}

/// Stable-per-process hash of a cache key.
#[must_use]
pub fn hash_key(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
