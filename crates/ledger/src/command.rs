//! Validated engine commands.
//!
//! Each command is a pure function from raw input to either a well-typed
//! command or a validation error, evaluated before any unit of work opens.
//! The engine only ever sees inputs that already satisfy the cheap
//! input-shape rules; balance-dependent rules stay inside the unit of work.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use payflow_core::{AccountId, Amount, DomainResult, MovementId};

/// Command: deposit `amount` into the caller's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCommand {
    pub amount: Amount,
    pub description: Option<String>,
}

impl DepositCommand {
    pub fn new(amount: Decimal, description: Option<String>) -> DomainResult<Self> {
        Ok(Self {
            amount: Amount::new(amount)?,
            description: normalize(description),
        })
    }
}

/// Command: transfer `amount` from the caller to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub receiver: AccountId,
    pub amount: Amount,
    pub description: Option<String>,
}

impl TransferCommand {
    pub fn new(
        receiver: AccountId,
        amount: Decimal,
        description: Option<String>,
    ) -> DomainResult<Self> {
        Ok(Self {
            receiver,
            amount: Amount::new(amount)?,
            description: normalize(description),
        })
    }
}

/// Command: reverse a prior completed movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseCommand {
    pub movement_id: MovementId,
    pub reason: Option<String>,
}

impl ReverseCommand {
    pub fn new(movement_id: MovementId, reason: Option<String>) -> Self {
        Self {
            movement_id,
            reason: normalize(reason),
        }
    }
}

/// Empty and whitespace-only descriptions collapse to `None`.
fn normalize(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use payflow_core::DomainError;
    use rust_decimal_macros::dec;

    #[test]
    fn deposit_command_rejects_non_positive_amounts() {
        let err = DepositCommand::new(dec!(0), None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let err = DepositCommand::new(dec!(-3.50), None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn transfer_command_carries_validated_amount() {
        let receiver = AccountId::new();
        let cmd = TransferCommand::new(receiver, dec!(12.34), Some("rent".into())).unwrap();
        assert_eq!(cmd.receiver, receiver);
        assert_eq!(cmd.amount.value(), dec!(12.34));
        assert_eq!(cmd.description.as_deref(), Some("rent"));
    }

    #[test]
    fn blank_descriptions_become_none() {
        let cmd = DepositCommand::new(dec!(1), Some("   ".into())).unwrap();
        assert_eq!(cmd.description, None);

        let cmd = ReverseCommand::new(MovementId::new(), Some(String::new()));
        assert_eq!(cmd.reason, None);
    }
}
