use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payflow_core::{AccountId, Amount, DomainError, DomainResult, MovementId};

/// Movement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Deposit,
    Transfer,
    Reversal,
}

/// Movement status lifecycle.
///
/// Transitions only move forward: `Pending -> Completed`,
/// `Pending -> Failed`, `Completed -> Reversed`. `Reversed` and `Failed`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Pending,
    Completed,
    Reversed,
    Failed,
}

impl MovementStatus {
    pub fn can_transition_to(self, next: MovementStatus) -> bool {
        matches!(
            (self, next),
            (MovementStatus::Pending, MovementStatus::Completed)
                | (MovementStatus::Pending, MovementStatus::Failed)
                | (MovementStatus::Completed, MovementStatus::Reversed)
        )
    }
}

/// A ledger movement: an immutable-once-settled record of a monetary event.
///
/// A `Deposit` has no sender; a `Transfer` has two distinct participants; a
/// `Reversal` back-references the movement it undoes and carries the
/// original participants with their roles swapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    id: MovementId,
    kind: MovementKind,
    status: MovementStatus,
    amount: Amount,
    description: Option<String>,
    sender: Option<AccountId>,
    receiver: Option<AccountId>,
    related_movement_id: Option<MovementId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Movement {
    /// New pending deposit into `receiver`.
    pub fn deposit(
        receiver: AccountId,
        amount: Amount,
        description: Option<String>,
    ) -> DomainResult<Self> {
        Ok(Self::pending(
            MovementKind::Deposit,
            amount,
            description,
            None,
            Some(receiver),
            None,
        ))
    }

    /// New pending transfer from `sender` to `receiver`.
    pub fn transfer(
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
        description: Option<String>,
    ) -> DomainResult<Self> {
        if sender == receiver {
            return Err(DomainError::validation("cannot transfer to self"));
        }
        Ok(Self::pending(
            MovementKind::Transfer,
            amount,
            description,
            Some(sender),
            Some(receiver),
            None,
        ))
    }

    /// New pending reversal compensating `original`.
    ///
    /// The original must be reversible (a completed deposit or transfer).
    /// Sender and receiver are the original's receiver and sender swapped,
    /// so the reversal reads as money flowing back.
    pub fn reversal(original: &Movement, reason: Option<String>) -> DomainResult<Self> {
        original.ensure_reversible()?;
        let description =
            reason.or_else(|| Some(format!("Reversal of movement {}", original.id)));
        Ok(Self::pending(
            MovementKind::Reversal,
            original.amount,
            description,
            original.receiver,
            original.sender,
            Some(original.id),
        ))
    }

    fn pending(
        kind: MovementKind,
        amount: Amount,
        description: Option<String>,
        sender: Option<AccountId>,
        receiver: Option<AccountId>,
        related_movement_id: Option<MovementId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MovementId::new(),
            kind,
            status: MovementStatus::Pending,
            amount,
            description,
            sender,
            receiver,
            related_movement_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> MovementId {
        self.id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn status(&self) -> MovementStatus {
        self.status
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn sender(&self) -> Option<AccountId> {
        self.sender
    }

    pub fn receiver(&self) -> Option<AccountId> {
        self.receiver
    }

    pub fn related_movement_id(&self) -> Option<MovementId> {
        self.related_movement_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True if `account` is the sender or the receiver.
    pub fn involves(&self, account: AccountId) -> bool {
        self.sender == Some(account) || self.receiver == Some(account)
    }

    /// Gate for reversal creation: only completed deposits and transfers
    /// can be reversed, and each at most once (a reversed movement is
    /// terminal, so the second attempt observes `Reversed`).
    pub fn ensure_reversible(&self) -> DomainResult<()> {
        if self.kind == MovementKind::Reversal {
            return Err(DomainError::validation("a reversal cannot be reversed"));
        }
        match self.status {
            MovementStatus::Completed => Ok(()),
            MovementStatus::Reversed => {
                Err(DomainError::conflict("movement already reversed"))
            }
            _ => Err(DomainError::validation(
                "only completed movements can be reversed",
            )),
        }
    }

    /// Move to `next`, enforcing the forward-only lifecycle.
    pub fn transition_to(&mut self, next: MovementStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "illegal status transition: {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> DomainResult<()> {
        self.transition_to(MovementStatus::Completed)
    }

    pub fn mark_reversed(&mut self) -> DomainResult<()> {
        self.transition_to(MovementStatus::Reversed)
    }

    pub fn mark_failed(&mut self) -> DomainResult<()> {
        self.transition_to(MovementStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn amount(v: rust_decimal::Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn deposit_has_receiver_and_no_sender() {
        let to = AccountId::new();
        let m = Movement::deposit(to, amount(dec!(10)), None).unwrap();
        assert_eq!(m.kind(), MovementKind::Deposit);
        assert_eq!(m.status(), MovementStatus::Pending);
        assert_eq!(m.sender(), None);
        assert_eq!(m.receiver(), Some(to));
        assert_eq!(m.related_movement_id(), None);
    }

    #[test]
    fn transfer_requires_distinct_participants() {
        let a = AccountId::new();
        let err = Movement::transfer(a, a, amount(dec!(10)), None).unwrap_err();
        assert_eq!(err, DomainError::validation("cannot transfer to self"));
    }

    #[test]
    fn reversal_swaps_roles_and_back_references() {
        let a = AccountId::new();
        let b = AccountId::new();
        let mut original = Movement::transfer(a, b, amount(dec!(25)), None).unwrap();
        original.complete().unwrap();

        let reversal = Movement::reversal(&original, None).unwrap();
        assert_eq!(reversal.kind(), MovementKind::Reversal);
        assert_eq!(reversal.sender(), Some(b));
        assert_eq!(reversal.receiver(), Some(a));
        assert_eq!(reversal.amount(), original.amount());
        assert_eq!(reversal.related_movement_id(), Some(original.id()));
        assert_eq!(
            reversal.description(),
            Some(format!("Reversal of movement {}", original.id()).as_str())
        );
    }

    #[test]
    fn reversal_keeps_supplied_reason() {
        let to = AccountId::new();
        let mut original = Movement::deposit(to, amount(dec!(5)), None).unwrap();
        original.complete().unwrap();

        let reversal =
            Movement::reversal(&original, Some("wrong account".to_string())).unwrap();
        assert_eq!(reversal.description(), Some("wrong account"));
    }

    #[test]
    fn pending_movement_is_not_reversible() {
        let to = AccountId::new();
        let original = Movement::deposit(to, amount(dec!(5)), None).unwrap();
        let err = Movement::reversal(&original, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reversed_movement_conflicts_on_second_reversal() {
        let to = AccountId::new();
        let mut original = Movement::deposit(to, amount(dec!(5)), None).unwrap();
        original.complete().unwrap();
        original.mark_reversed().unwrap();

        let err = Movement::reversal(&original, None).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn a_reversal_cannot_itself_be_reversed() {
        let a = AccountId::new();
        let b = AccountId::new();
        let mut original = Movement::transfer(a, b, amount(dec!(25)), None).unwrap();
        original.complete().unwrap();
        let mut reversal = Movement::reversal(&original, None).unwrap();
        reversal.complete().unwrap();

        let err = Movement::reversal(&reversal, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn lifecycle_is_forward_only() {
        let to = AccountId::new();
        let mut m = Movement::deposit(to, amount(dec!(5)), None).unwrap();

        // Pending -> Reversed is not an edge.
        assert!(m.mark_reversed().is_err());

        m.complete().unwrap();
        // Completed -> Completed / Failed are not edges.
        assert!(m.complete().is_err());
        assert!(m.mark_failed().is_err());

        m.mark_reversed().unwrap();
        // Reversed is terminal.
        assert!(m.complete().is_err());
        assert!(m.mark_reversed().is_err());
    }

    #[test]
    fn failed_is_terminal() {
        let to = AccountId::new();
        let mut m = Movement::deposit(to, amount(dec!(5)), None).unwrap();
        m.mark_failed().unwrap();
        assert!(m.complete().is_err());
        assert!(m.mark_reversed().is_err());
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&MovementStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&MovementKind::Deposit).unwrap(),
            "\"deposit\""
        );
    }

    proptest! {
        /// Property: no transition relation ever leaves Reversed or Failed.
        #[test]
        fn terminal_statuses_have_no_outgoing_edges(
            next in prop::sample::select(vec![
                MovementStatus::Pending,
                MovementStatus::Completed,
                MovementStatus::Reversed,
                MovementStatus::Failed,
            ])
        ) {
            prop_assert!(!MovementStatus::Reversed.can_transition_to(next));
            prop_assert!(!MovementStatus::Failed.can_transition_to(next));
        }
    }
}
