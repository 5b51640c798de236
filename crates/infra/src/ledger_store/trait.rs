use std::sync::Arc;

use thiserror::Error;

use payflow_core::{AccountId, MovementId};
use payflow_ledger::{Movement, MovementStatus};

/// One staged write inside a unit of work's commit batch.
#[derive(Debug, Clone)]
pub enum MovementWrite {
    /// Insert a new movement row.
    Insert(Movement),
    /// Move an existing row's status along the lifecycle.
    SetStatus {
        id: MovementId,
        status: MovementStatus,
    },
}

/// Ledger store operation error.
///
/// These are infrastructure errors; the engine maps them into its generic
/// abort error, never exposing them to callers directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerStoreError {
    #[error("unknown movement: {0}")]
    UnknownMovement(MovementId),

    #[error("duplicate movement: {0}")]
    DuplicateMovement(MovementId),

    #[error("illegal status transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: MovementStatus,
        to: MovementStatus,
    },

    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
}

/// Durable, ordered collection of movements.
///
/// Implementations must:
/// - apply a batch atomically: validate every write first, then mutate, so
///   a rejected batch leaves no trace
/// - enforce status-transition legality on `SetStatus` writes
/// - return participant queries ordered by `created_at` descending
pub trait LedgerStore: Send + Sync {
    /// Apply a batch of writes, all-or-nothing.
    fn apply(&self, writes: Vec<MovementWrite>) -> Result<(), LedgerStoreError>;

    /// Point lookup by id.
    fn get(&self, id: MovementId) -> Result<Option<Movement>, LedgerStoreError>;

    /// All movements where `account_id` is sender or receiver, most recent
    /// first.
    fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Movement>, LedgerStoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn apply(&self, writes: Vec<MovementWrite>) -> Result<(), LedgerStoreError> {
        (**self).apply(writes)
    }

    fn get(&self, id: MovementId) -> Result<Option<Movement>, LedgerStoreError> {
        (**self).get(id)
    }

    fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Movement>, LedgerStoreError> {
        (**self).list_for_account(account_id)
    }
}
