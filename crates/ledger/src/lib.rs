//! `payflow-ledger` — the movement data model and its lifecycle.
//!
//! A [`Movement`] is an immutable-once-settled record of a monetary event:
//! a deposit, a peer transfer, or a reversal compensating a prior movement.
//! Constructors enforce the per-kind participant invariants; transition
//! methods enforce the forward-only status lifecycle. Commands in
//! [`command`] are the validated inputs the transaction engine accepts.

pub mod command;
pub mod movement;

pub use command::{DepositCommand, ReverseCommand, TransferCommand};
pub use movement::{Movement, MovementKind, MovementStatus};
