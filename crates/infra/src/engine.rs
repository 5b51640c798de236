//! The transaction engine.
//!
//! Orchestrates the three movement kinds (deposit, transfer, reversal) as
//! atomic units of work spanning balance adjustments and ledger writes.
//!
//! ## Unit of work
//!
//! Each mutating operation:
//!
//! 1. runs its fail-fast preconditions outside any lock,
//! 2. acquires the per-account locks in fixed sorted order
//!    ([`crate::locks`]), serializing against every other unit of work that
//!    touches an overlapping account set,
//! 3. re-reads whatever state the operation depends on **under the locks**
//!    (a transfer's sufficiency check, a reversal's status gate), so no
//!    decision is ever made against a balance another unit of work is about
//!    to supersede,
//! 4. applies balance adjustments through the directory, recording a
//!    compensation for each (undone in reverse order on abort; restoration
//!    is exact because the locks are still held),
//! 5. flushes the ledger writes as one all-or-nothing batch only after
//!    every adjustment has succeeded, then commits.
//!
//! An abort therefore leaves no movement row and no net balance change.
//!
//! ## Error surfacing
//!
//! Domain failures raised inside a unit of work (insufficient balance,
//! reversal conflicts) propagate to the caller unchanged after the abort.
//! Anything else — store failures, a directory backend going away — is
//! logged and wrapped into the operation's generic validation error, so
//! callers only ever observe full success or a categorized failure.

use rust_decimal::Decimal;
use thiserror::Error;

use payflow_core::{AccountId, DomainError, DomainResult, MovementId};
use payflow_ledger::{
    DepositCommand, Movement, MovementKind, MovementStatus, ReverseCommand, TransferCommand,
};

use crate::directory::{AccountDirectory, AccountRecord, DirectoryError};
use crate::ledger_store::{LedgerStore, LedgerStoreError, MovementWrite};
use crate::locks::{self, AccountLockTable};

/// A movement with its participants resolved to directory records.
///
/// Read-side counterpart of the ledger's account-reference fields; a
/// participant that no longer resolves is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementDetail {
    pub movement: Movement,
    pub sender: Option<AccountRecord>,
    pub receiver: Option<AccountRecord>,
}

/// Failure inside a unit of work, before surfacing.
#[derive(Debug, Error)]
enum UowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] LedgerStoreError),

    #[error("directory failure: {0}")]
    Directory(String),
}

impl From<DirectoryError> for UowError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound => UowError::Domain(DomainError::NotFound),
            DirectoryError::InsufficientFunds { .. } => {
                UowError::Domain(DomainError::validation("insufficient balance"))
            }
            DirectoryError::Inactive(id) => {
                UowError::Domain(DomainError::validation(format!("account {id} is not active")))
            }
            DirectoryError::Unavailable(msg) => UowError::Directory(msg),
        }
    }
}

/// Map a unit-of-work failure to the caller-facing error.
///
/// Business failures pass through unchanged; everything else becomes the
/// operation's generic validation error after the abort. A `NotFound`
/// leaking from *inside* a unit of work is also wrapped: existence is a
/// precondition, so losing a row mid-flight is an infrastructure problem.
fn surface<T>(op: &'static str, result: Result<T, UowError>) -> DomainResult<T> {
    result.map_err(|err| match err {
        UowError::Domain(err @ (DomainError::Validation(_) | DomainError::Conflict(_))) => err,
        other => abort_error(op, &other),
    })
}

fn abort_error(op: &'static str, err: &dyn core::fmt::Display) -> DomainError {
    tracing::error!(operation = op, error = %err, "unit of work aborted");
    DomainError::validation(format!("{op} could not be processed"))
}

/// Balance adjustments with compensation on abort.
///
/// Adjustments apply eagerly through the directory; each success pushes its
/// inverse. Dropping the unit of work without committing replays the
/// inverses in reverse order. The caller holds the account locks for the
/// whole lifetime of this value, so the replay restores the exact prior
/// balances and no other unit of work observes the intermediate ones.
struct UnitOfWork<'a, D: AccountDirectory> {
    directory: &'a D,
    applied: Vec<(AccountId, Decimal)>,
    committed: bool,
}

impl<'a, D: AccountDirectory> UnitOfWork<'a, D> {
    fn new(directory: &'a D) -> Self {
        Self {
            directory,
            applied: Vec::new(),
            committed: false,
        }
    }

    fn adjust(&mut self, account_id: AccountId, delta: Decimal) -> Result<(), UowError> {
        self.directory.adjust_balance(account_id, delta)?;
        self.applied.push((account_id, delta));
        Ok(())
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl<'a, D: AccountDirectory> Drop for UnitOfWork<'a, D> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for (account_id, delta) in self.applied.drain(..).rev() {
            if let Err(err) = self.directory.adjust_balance(account_id, -delta) {
                // Undoing a credit cannot overdraw and the locks are still
                // held, so this only fires on directory unavailability.
                tracing::error!(
                    account = %account_id,
                    delta = %delta,
                    error = %err,
                    "failed to roll back balance adjustment"
                );
            }
        }
    }
}

/// Creates ledger movements, mutates balances, and reverses prior movements.
///
/// Generic over the directory and store boundaries so tests wire in-memory
/// implementations and deployments swap in real backends.
#[derive(Debug)]
pub struct TransactionEngine<D, S> {
    directory: D,
    store: S,
    locks: AccountLockTable,
}

impl<D, S> TransactionEngine<D, S>
where
    D: AccountDirectory,
    S: LedgerStore,
{
    pub fn new(directory: D, store: S) -> Self {
        Self {
            directory,
            store,
            locks: AccountLockTable::new(),
        }
    }

    /// Deposit `cmd.amount` into the caller's account.
    pub fn deposit(&self, actor: AccountId, cmd: DepositCommand) -> DomainResult<Movement> {
        surface("deposit", self.deposit_uow(actor, cmd))
    }

    fn deposit_uow(&self, actor: AccountId, cmd: DepositCommand) -> Result<Movement, UowError> {
        let handles = self.locks.handles(&[actor]);
        let _guards = locks::acquire(&handles);

        let mut movement = Movement::deposit(actor, cmd.amount, cmd.description)?;
        let mut uow = UnitOfWork::new(&self.directory);
        uow.adjust(actor, cmd.amount.value())?;
        movement.complete()?;
        self.store.apply(vec![MovementWrite::Insert(movement.clone())])?;
        uow.commit();

        tracing::info!(
            movement = %movement.id(),
            account = %actor,
            amount = %movement.amount(),
            "deposit completed"
        );
        Ok(movement)
    }

    /// Transfer `cmd.amount` from the caller to `cmd.receiver`.
    pub fn transfer(&self, actor: AccountId, cmd: TransferCommand) -> DomainResult<Movement> {
        // Fail-fast preconditions, outside the unit of work.
        if actor == cmd.receiver {
            return Err(DomainError::validation("cannot transfer to self"));
        }
        match self.directory.lookup(cmd.receiver) {
            Ok(receiver) if receiver.active => {}
            Ok(_) => {
                return Err(DomainError::validation("receiver account is not active"));
            }
            Err(DirectoryError::NotFound) => return Err(DomainError::NotFound),
            Err(err) => return Err(abort_error("transfer", &err)),
        }

        surface("transfer", self.transfer_uow(actor, cmd))
    }

    fn transfer_uow(&self, actor: AccountId, cmd: TransferCommand) -> Result<Movement, UowError> {
        let handles = self.locks.handles(&[actor, cmd.receiver]);
        let _guards = locks::acquire(&handles);

        // Both participants re-resolve under the locks; the fail-fast checks
        // above ran unprotected and may be stale (a receiver deactivated in
        // between is caught by the credit below).
        let sender = self.directory.lookup(actor)?;
        if sender.balance < cmd.amount.value() {
            return Err(DomainError::validation("insufficient balance").into());
        }

        let mut movement =
            Movement::transfer(actor, cmd.receiver, cmd.amount, cmd.description)?;
        let mut uow = UnitOfWork::new(&self.directory);
        uow.adjust(actor, -cmd.amount.value())?;
        uow.adjust(cmd.receiver, cmd.amount.value())?;
        movement.complete()?;
        self.store.apply(vec![MovementWrite::Insert(movement.clone())])?;
        uow.commit();

        tracing::info!(
            movement = %movement.id(),
            sender = %actor,
            receiver = %cmd.receiver,
            amount = %movement.amount(),
            "transfer completed"
        );
        Ok(movement)
    }

    /// Reverse a prior completed movement the caller participated in.
    pub fn reverse(&self, actor: AccountId, cmd: ReverseCommand) -> DomainResult<Movement> {
        // Fail-fast preconditions, outside the unit of work.
        let target = self
            .store
            .get(cmd.movement_id)
            .map_err(|err| abort_error("reversal", &err))?
            .ok_or(DomainError::NotFound)?;
        target.ensure_reversible()?;
        if !target.involves(actor) {
            return Err(DomainError::validation(
                "not authorized to reverse this movement",
            ));
        }

        surface("reversal", self.reverse_uow(&target, cmd.reason))
    }

    fn reverse_uow(
        &self,
        target: &Movement,
        reason: Option<String>,
    ) -> Result<Movement, UowError> {
        // Participant accounts are immutable on the movement, so the lock
        // set derived from the precondition read is stable.
        let accounts: Vec<AccountId> = target
            .sender()
            .into_iter()
            .chain(target.receiver())
            .collect();
        let handles = self.locks.handles(&accounts);
        let _guards = locks::acquire(&handles);

        // Re-read under the locks: two racing reversals of the same movement
        // serialize here, and the loser observes `Reversed`.
        let target = self
            .store
            .get(target.id())?
            .ok_or(LedgerStoreError::UnknownMovement(target.id()))?;
        target.ensure_reversible()?;

        let mut reversal = Movement::reversal(&target, reason)?;
        let mut uow = UnitOfWork::new(&self.directory);
        match target.kind() {
            MovementKind::Transfer => {
                if let Some(sender) = target.sender() {
                    uow.adjust(sender, target.amount().value())?;
                }
                if let Some(receiver) = target.receiver() {
                    uow.adjust(receiver, -target.amount().value())?;
                }
            }
            MovementKind::Deposit => {
                if let Some(receiver) = target.receiver() {
                    uow.adjust(receiver, -target.amount().value())?;
                }
            }
            // `ensure_reversible` already rejected this kind.
            MovementKind::Reversal => {
                return Err(DomainError::validation("a reversal cannot be reversed").into());
            }
        }
        reversal.complete()?;
        self.store.apply(vec![
            MovementWrite::Insert(reversal.clone()),
            MovementWrite::SetStatus {
                id: target.id(),
                status: MovementStatus::Reversed,
            },
        ])?;
        uow.commit();

        tracing::info!(
            movement = %reversal.id(),
            reversed = %target.id(),
            amount = %reversal.amount(),
            "reversal completed"
        );
        Ok(reversal)
    }

    /// All movements the account sent or received, most recent first.
    pub fn list_for_account(&self, account_id: AccountId) -> DomainResult<Vec<Movement>> {
        self.store
            .list_for_account(account_id)
            .map_err(|err| abort_error("query", &err))
    }

    /// Point lookup with participants resolved through the directory.
    pub fn get_by_id(&self, id: MovementId) -> DomainResult<MovementDetail> {
        let movement = self
            .store
            .get(id)
            .map_err(|err| abort_error("query", &err))?
            .ok_or(DomainError::NotFound)?;
        let sender = movement
            .sender()
            .and_then(|a| self.directory.lookup(a).ok());
        let receiver = movement
            .receiver()
            .and_then(|a| self.directory.lookup(a).ok());
        Ok(MovementDetail {
            movement,
            sender,
            receiver,
        })
    }
}
