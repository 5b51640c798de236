use std::collections::HashMap;
use std::sync::RwLock;

use payflow_core::{AccountId, MovementId};
use payflow_ledger::{Movement, MovementStatus};

use super::r#trait::{LedgerStore, LedgerStoreError, MovementWrite};

#[derive(Debug, Default)]
struct Rows {
    /// Insertion-ordered movement rows.
    movements: Vec<Movement>,
    index: HashMap<MovementId, usize>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A batch is validated in full against the current
/// rows (plus the batch's own staged effects) before anything mutates, so a
/// rejected batch leaves no trace and readers never observe a partial one.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Rows>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> LedgerStoreError {
        LedgerStoreError::Unavailable("lock poisoned".to_string())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn apply(&self, writes: Vec<MovementWrite>) -> Result<(), LedgerStoreError> {
        let mut rows = self.inner.write().map_err(|_| Self::poisoned())?;

        // Validation pass: track the status each row would have after the
        // writes staged so far in this batch.
        let mut staged: HashMap<MovementId, MovementStatus> = HashMap::new();
        for write in &writes {
            match write {
                MovementWrite::Insert(movement) => {
                    let id = movement.id();
                    if rows.index.contains_key(&id) || staged.contains_key(&id) {
                        return Err(LedgerStoreError::DuplicateMovement(id));
                    }
                    staged.insert(id, movement.status());
                }
                MovementWrite::SetStatus { id, status } => {
                    let current = staged
                        .get(id)
                        .copied()
                        .or_else(|| rows.index.get(id).map(|&i| rows.movements[i].status()))
                        .ok_or(LedgerStoreError::UnknownMovement(*id))?;
                    if !current.can_transition_to(*status) {
                        return Err(LedgerStoreError::IllegalTransition {
                            from: current,
                            to: *status,
                        });
                    }
                    staged.insert(*id, *status);
                }
            }
        }

        for write in writes {
            match write {
                MovementWrite::Insert(movement) => {
                    let pos = rows.movements.len();
                    rows.index.insert(movement.id(), pos);
                    rows.movements.push(movement);
                }
                MovementWrite::SetStatus { id, status } => {
                    let i = rows.index[&id];
                    let from = rows.movements[i].status();
                    rows.movements[i]
                        .transition_to(status)
                        .map_err(|_| LedgerStoreError::IllegalTransition { from, to: status })?;
                }
            }
        }

        Ok(())
    }

    fn get(&self, id: MovementId) -> Result<Option<Movement>, LedgerStoreError> {
        let rows = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(rows.index.get(&id).map(|&i| rows.movements[i].clone()))
    }

    fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Movement>, LedgerStoreError> {
        let rows = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut out: Vec<Movement> = rows
            .movements
            .iter()
            .rev()
            .filter(|m| m.involves(account_id))
            .cloned()
            .collect();
        // Stable sort: equal timestamps keep newest-inserted first.
        out.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payflow_core::Amount;
    use rust_decimal_macros::dec;

    fn deposit(receiver: AccountId) -> Movement {
        Movement::deposit(receiver, Amount::new(dec!(10)).unwrap(), None).unwrap()
    }

    #[test]
    fn inserted_movements_are_retrievable() {
        let store = InMemoryLedgerStore::new();
        let account = AccountId::new();
        let movement = deposit(account);
        let id = movement.id();

        store.apply(vec![MovementWrite::Insert(movement)]).unwrap();

        let found = store.get(id).unwrap().unwrap();
        assert_eq!(found.id(), id);
        assert!(store.get(MovementId::new()).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = InMemoryLedgerStore::new();
        let movement = deposit(AccountId::new());
        let id = movement.id();

        store
            .apply(vec![MovementWrite::Insert(movement.clone())])
            .unwrap();
        let err = store.apply(vec![MovementWrite::Insert(movement)]).unwrap_err();
        assert_eq!(err, LedgerStoreError::DuplicateMovement(id));
    }

    #[test]
    fn set_status_enforces_the_lifecycle() {
        let store = InMemoryLedgerStore::new();
        let movement = deposit(AccountId::new());
        let id = movement.id();
        store.apply(vec![MovementWrite::Insert(movement)]).unwrap();

        // Pending -> Reversed is not an edge.
        let err = store
            .apply(vec![MovementWrite::SetStatus {
                id,
                status: MovementStatus::Reversed,
            }])
            .unwrap_err();
        assert_eq!(
            err,
            LedgerStoreError::IllegalTransition {
                from: MovementStatus::Pending,
                to: MovementStatus::Reversed,
            }
        );

        store
            .apply(vec![MovementWrite::SetStatus {
                id,
                status: MovementStatus::Completed,
            }])
            .unwrap();
        assert_eq!(
            store.get(id).unwrap().unwrap().status(),
            MovementStatus::Completed
        );
    }

    #[test]
    fn rejected_batch_leaves_no_trace() {
        let store = InMemoryLedgerStore::new();
        let movement = deposit(AccountId::new());
        let id = movement.id();

        // Second write is invalid, so the insert must not survive either.
        let err = store
            .apply(vec![
                MovementWrite::Insert(movement),
                MovementWrite::SetStatus {
                    id: MovementId::new(),
                    status: MovementStatus::Completed,
                },
            ])
            .unwrap_err();
        assert!(matches!(err, LedgerStoreError::UnknownMovement(_)));
        assert!(store.get(id).unwrap().is_none());
    }

    #[test]
    fn batch_can_update_a_row_it_inserted() {
        let store = InMemoryLedgerStore::new();
        let movement = deposit(AccountId::new());
        let id = movement.id();

        store
            .apply(vec![
                MovementWrite::Insert(movement),
                MovementWrite::SetStatus {
                    id,
                    status: MovementStatus::Completed,
                },
            ])
            .unwrap();
        assert_eq!(
            store.get(id).unwrap().unwrap().status(),
            MovementStatus::Completed
        );
    }

    #[test]
    fn list_is_most_recent_first_and_covers_both_roles() {
        let store = InMemoryLedgerStore::new();
        let a = AccountId::new();
        let b = AccountId::new();

        let first = deposit(a);
        let second =
            Movement::transfer(a, b, Amount::new(dec!(3)).unwrap(), None).unwrap();
        let third =
            Movement::transfer(b, a, Amount::new(dec!(2)).unwrap(), None).unwrap();
        let ids = [first.id(), second.id(), third.id()];

        for m in [first, second, third] {
            store.apply(vec![MovementWrite::Insert(m)]).unwrap();
        }

        let listed = store.list_for_account(a).unwrap();
        let listed_ids: Vec<_> = listed.iter().map(|m| m.id()).collect();
        assert_eq!(listed_ids, vec![ids[2], ids[1], ids[0]]);

        // b only participates in the two transfers.
        let listed_b = store.list_for_account(b).unwrap();
        assert_eq!(listed_b.len(), 2);
    }
}
