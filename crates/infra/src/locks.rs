//! Per-account serialization.
//!
//! Every mutating unit of work holds the mutex of each account it touches
//! for its whole duration. Handles are returned deduplicated and sorted by
//! account id, and callers acquire them in that order, so two units of work
//! locking overlapping account sets can never wait on each other in a cycle
//! (two opposing transfers between the same pair lock the pair in the same
//! order).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use payflow_core::AccountId;

/// Lazily populated table of one mutex per account.
#[derive(Debug, Default)]
pub struct AccountLockTable {
    inner: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl AccountLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the lock handles for `accounts`, deduplicated and sorted by
    /// id. The table lock is held only while resolving, never while any
    /// account lock is held.
    pub fn handles(&self, accounts: &[AccountId]) -> Vec<Arc<Mutex<()>>> {
        let mut ids = accounts.to_vec();
        ids.sort();
        ids.dedup();

        let mut table = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        ids.iter()
            .map(|id| Arc::clone(table.entry(*id).or_default()))
            .collect()
    }
}

/// Acquire the handles in the order given (callers pass the sorted output of
/// [`AccountLockTable::handles`]). The guarded value is `()`, so a poisoned
/// lock is taken as-is.
pub fn acquire(handles: &[Arc<Mutex<()>>]) -> Vec<MutexGuard<'_, ()>> {
    handles
        .iter()
        .map(|h| h.lock().unwrap_or_else(PoisonError::into_inner))
        .collect()
}
