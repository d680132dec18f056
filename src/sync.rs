//! Mutex helpers shared by the caches.

use std::sync::{Mutex, MutexGuard};

/// Lock `mutex`, recovering the data if a previous holder panicked.
/// Cache entries are inserted whole, so recovered data is complete.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
