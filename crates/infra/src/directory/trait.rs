use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use payflow_core::AccountId;

/// Directory view of an account.
///
/// Identity/credential data lives with the identity provider; the directory
/// only knows what the ledger needs: the balance and whether the account may
/// participate in movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub name: String,
    pub balance: Decimal,
    pub active: bool,
}

/// Directory operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("account not found")]
    NotFound,

    /// The adjustment would drive the balance negative. Nothing changed.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("account {0} is not active")]
    Inactive(AccountId),

    /// Infrastructure failure (backend unreachable, poisoned lock, ...).
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Account balance owner.
///
/// Implementations must apply `adjust_balance` atomically per account row:
/// the `balance >= 0` invariant is checked against the row's current value
/// and a failing adjustment leaves the row untouched.
pub trait AccountDirectory: Send + Sync {
    /// Resolve an account by id.
    fn lookup(&self, account_id: AccountId) -> Result<AccountRecord, DirectoryError>;

    /// Apply a signed delta to the account's balance.
    ///
    /// Fails with [`DirectoryError::InsufficientFunds`] if the resulting
    /// balance would be negative and with [`DirectoryError::Inactive`] if
    /// the account may not participate in movements. Returns the updated
    /// record on success.
    fn adjust_balance(
        &self,
        account_id: AccountId,
        delta: Decimal,
    ) -> Result<AccountRecord, DirectoryError>;
}

impl<D> AccountDirectory for Arc<D>
where
    D: AccountDirectory + ?Sized,
{
    fn lookup(&self, account_id: AccountId) -> Result<AccountRecord, DirectoryError> {
        (**self).lookup(account_id)
    }

    fn adjust_balance(
        &self,
        account_id: AccountId,
        delta: Decimal,
    ) -> Result<AccountRecord, DirectoryError> {
        (**self).adjust_balance(account_id, delta)
    }
}
