//! Poison-recovering lock guards.
//!
//! Cache and store state stays usable after a panic in another thread; the
//! recovery is logged so stale reads can be traced back to the poisoning.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn log_poison(component: &'static str, op: &'static str, kind: &'static str) {
    warn!(
        component,
        op,
        kind,
        "recovered a poisoned lock; guarded state may be stale from a panicked thread"
    );
}

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    component: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        log_poison(component, op, "mutex.lock");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    component: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        log_poison(component, op, "rwlock.read");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    component: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log_poison(component, op, "rwlock.write");
        poisoned.into_inner()
    })
}
