//! Poison-tolerant wrappers around std locks.
//!
//! Cache and store state guarded by these locks is always valid JSON-mapped
//! data; a panic in another thread must not take the caches down with it.
//! Recovery is logged so crashes still leave a trace.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn mutex_lock<'a, T>(lock: &'a Mutex<T>, label: &'static str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(lock = label, "recovered poisoned mutex; state may be stale");
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, label: &'static str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(lock = label, "recovered poisoned rwlock read; state may be stale");
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, label: &'static str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(lock = label, "recovered poisoned rwlock write; state may be stale");
            poisoned.into_inner()
        }
    }
}
