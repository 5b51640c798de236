use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use payflow_core::AccountId;

use super::r#trait::{AccountDirectory, AccountRecord, DirectoryError};

/// In-memory account directory.
///
/// Intended for tests/dev and single-process deployments. Per-row atomicity
/// comes from the single `RwLock` guard held across each adjustment.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<AccountId, AccountRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new active account with an opening balance.
    pub fn register(
        &self,
        name: impl Into<String>,
        opening_balance: Decimal,
    ) -> Result<AccountRecord, DirectoryError> {
        let record = AccountRecord {
            id: AccountId::new(),
            name: name.into(),
            balance: opening_balance,
            active: true,
        };
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        accounts.insert(record.id, record.clone());
        Ok(record)
    }

    /// Deactivate an account; it keeps its balance but may no longer
    /// participate in movements.
    pub fn deactivate(&self, account_id: AccountId) -> Result<(), DirectoryError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        let record = accounts
            .get_mut(&account_id)
            .ok_or(DirectoryError::NotFound)?;
        record.active = false;
        Ok(())
    }
}

impl AccountDirectory for InMemoryDirectory {
    fn lookup(&self, account_id: AccountId) -> Result<AccountRecord, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        accounts
            .get(&account_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    fn adjust_balance(
        &self,
        account_id: AccountId,
        delta: Decimal,
    ) -> Result<AccountRecord, DirectoryError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        let record = accounts
            .get_mut(&account_id)
            .ok_or(DirectoryError::NotFound)?;

        if !record.active {
            return Err(DirectoryError::Inactive(account_id));
        }

        let next = record.balance + delta;
        if next < Decimal::ZERO {
            return Err(DirectoryError::InsufficientFunds {
                requested: -delta,
                available: record.balance,
            });
        }

        record.balance = next;
        Ok(record.clone())
    }
}
